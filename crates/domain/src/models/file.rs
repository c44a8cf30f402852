//! File and cover image records attached to events.

use serde::{Deserialize, Serialize};
use shared::validation::{MAX_COVER_POSITION, MAX_FILE_NAME_LEN};
use validator::Validate;

/// An uploaded file referenced by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct File {
    #[validate(url(message = "File url must be a valid URL"))]
    pub url: String,

    #[validate(length(max = MAX_FILE_NAME_LEN, message = "File name must be at most 250 characters"))]
    pub name: String,

    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "File type must not be empty"))]
    pub file_type: String,
}

/// A cover image with a display position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CoverImage {
    #[validate(length(min = 1, message = "Cover image url must not be empty"))]
    pub url: String,

    #[validate(length(max = MAX_FILE_NAME_LEN, message = "Cover image name must be at most 250 characters"))]
    pub name: String,

    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "Cover image type must not be empty"))]
    pub file_type: String,

    #[validate(range(min = 0, max = MAX_COVER_POSITION, message = "Cover image position must be between 0 and 20"))]
    pub position: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cover(position: i32) -> CoverImage {
        CoverImage {
            url: "https://cdn.example.com/c.png".into(),
            name: "c".into(),
            file_type: "image/png".into(),
            position,
        }
    }

    #[test]
    fn test_cover_position_bounds() {
        assert!(cover(0).validate().is_ok());
        assert!(cover(20).validate().is_ok());
        assert!(cover(21).validate().is_err());
        assert!(cover(-1).validate().is_err());
    }

    #[test]
    fn test_file_requires_valid_url_and_type() {
        let file = File {
            url: "not a url".into(),
            name: "doc.pdf".into(),
            file_type: "application/pdf".into(),
        };
        assert!(file.validate().is_err());

        let file = File {
            url: "https://cdn.example.com/doc.pdf".into(),
            name: "doc.pdf".into(),
            file_type: String::new(),
        };
        assert!(file.validate().is_err());
    }

    #[test]
    fn test_file_type_serialized_as_type() {
        let json = serde_json::to_value(cover(1)).unwrap();
        assert_eq!(json["type"], "image/png");
        assert_eq!(json["position"], 1);
    }
}
