//! Partial event updates driven by an explicit field mask.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::validation::{
    MAX_DESCRIPTION_LEN, MAX_LOCATION_LINK_LEN, MAX_LOCATION_UNIVERSITY_LEN, MAX_PARTICIPANTS,
    MAX_TAGS, MAX_TITLE_LEN,
};
use std::fmt;
use validator::Validate;

use super::event::EventType;
use super::file::{CoverImage, File};
use crate::error::DomainError;

/// Desired field values for an update. Only fields named in the mask apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EventPatch {
    #[validate(length(max = MAX_TITLE_LEN, message = "title must be at most 500 characters"))]
    pub title: String,

    #[validate(length(max = MAX_DESCRIPTION_LEN, message = "description must be at most 35000 characters"))]
    pub description: String,

    #[serde(rename = "type")]
    pub event_type: Option<EventType>,

    #[validate(
        length(max = MAX_TAGS, message = "at most 15 tags are allowed"),
        custom(function = "shared::validation::validate_tags")
    )]
    pub tags: Vec<String>,

    #[validate(nested)]
    pub cover_images: Vec<CoverImage>,

    #[validate(nested)]
    pub attached_images: Vec<File>,

    #[validate(nested)]
    pub attached_files: Vec<File>,

    #[validate(custom(function = "shared::validation::validate_event_date"))]
    pub start_date: Option<DateTime<Utc>>,

    #[validate(custom(function = "shared::validation::validate_event_date"))]
    pub end_date: Option<DateTime<Utc>>,

    #[validate(length(max = MAX_LOCATION_LINK_LEN, message = "location_link must be at most 2500 characters"))]
    pub location_link: String,

    #[validate(length(max = MAX_LOCATION_UNIVERSITY_LEN, message = "location_university must be at most 250 characters"))]
    pub location_university: String,

    #[validate(range(min = 0, max = MAX_PARTICIPANTS, message = "max_participants must be between 0 and 100000"))]
    pub max_participants: i32,
}

/// A field an update may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePath {
    Title,
    Description,
    #[serde(rename = "type")]
    Type,
    Tags,
    CoverImages,
    AttachedImages,
    AttachedFiles,
    StartDate,
    EndDate,
    LocationLink,
    LocationUniversity,
    MaxParticipants,
}

impl UpdatePath {
    /// Order in which fields are applied.
    pub const PRIORITY: [UpdatePath; 12] = [
        UpdatePath::Title,
        UpdatePath::Description,
        UpdatePath::Type,
        UpdatePath::Tags,
        UpdatePath::CoverImages,
        UpdatePath::AttachedImages,
        UpdatePath::AttachedFiles,
        UpdatePath::StartDate,
        UpdatePath::EndDate,
        UpdatePath::LocationLink,
        UpdatePath::LocationUniversity,
        UpdatePath::MaxParticipants,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpdatePath::Title => "title",
            UpdatePath::Description => "description",
            UpdatePath::Type => "type",
            UpdatePath::Tags => "tags",
            UpdatePath::CoverImages => "cover_images",
            UpdatePath::AttachedImages => "attached_images",
            UpdatePath::AttachedFiles => "attached_files",
            UpdatePath::StartDate => "start_date",
            UpdatePath::EndDate => "end_date",
            UpdatePath::LocationLink => "location_link",
            UpdatePath::LocationUniversity => "location_university",
            UpdatePath::MaxParticipants => "max_participants",
        }
    }

    /// Parses a field mask, rejecting unknown paths.
    pub fn parse_mask<S: AsRef<str>>(paths: &[S]) -> Result<Vec<UpdatePath>, DomainError> {
        let mut parsed = Vec::with_capacity(paths.len());
        for path in paths {
            let path: UpdatePath = path.as_ref().parse()?;
            if !parsed.contains(&path) {
                parsed.push(path);
            }
        }
        Ok(parsed)
    }
}

impl fmt::Display for UpdatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UpdatePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UpdatePath::PRIORITY
            .iter()
            .copied()
            .find(|path| path.as_str() == s.trim())
            .ok_or_else(|| DomainError::InvalidArgument(format!("unknown update path: {}", s)))
    }
}
