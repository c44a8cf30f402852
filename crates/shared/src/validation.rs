//! Common validation utilities for event fields.

use chrono::{DateTime, Months, Utc};
use validator::ValidationError;

pub const MAX_TITLE_LEN: u64 = 500;
pub const MAX_DESCRIPTION_LEN: u64 = 35_000;
pub const MIN_TAG_LEN: usize = 2;
pub const MAX_TAG_LEN: usize = 75;
pub const MAX_TAGS: u64 = 15;
pub const MAX_LOCATION_LINK_LEN: u64 = 2_500;
pub const MAX_LOCATION_UNIVERSITY_LEN: u64 = 250;
pub const MAX_FILE_NAME_LEN: u64 = 250;
pub const MAX_COVER_POSITION: i32 = 20;
pub const MAX_PARTICIPANTS: i32 = 100_000;
pub const MAX_REASON_LEN: u64 = 1_000;

/// How far in the past an event date may lie, in years.
pub const PAST_WINDOW_YEARS: u32 = 6;

/// How far in the future an event date may lie when edited, in years.
pub const FUTURE_WINDOW_YEARS: u32 = 10;

/// How far in the future an event date may lie when published, in years.
pub const PUBLISH_FUTURE_WINDOW_YEARS: u32 = 6;

/// Validates every tag is 2-75 characters after trimming.
pub fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    for tag in tags {
        let len = tag.trim().chars().count();
        if !(MIN_TAG_LEN..=MAX_TAG_LEN).contains(&len) {
            let mut err = ValidationError::new("tag_length");
            err.message = Some(
                format!("Each tag must be between {MIN_TAG_LEN} and {MAX_TAG_LEN} characters").into(),
            );
            return Err(err);
        }
    }
    Ok(())
}

/// Validates a date lies between 6 years ago and 10 years from now.
pub fn validate_event_date(date: &DateTime<Utc>) -> Result<(), ValidationError> {
    if is_within_window(date, Utc::now(), PAST_WINDOW_YEARS, FUTURE_WINDOW_YEARS) {
        Ok(())
    } else {
        let mut err = ValidationError::new("date_range");
        err.message = Some(
            format!(
                "Date must be within {PAST_WINDOW_YEARS} years in the past and {FUTURE_WINDOW_YEARS} years in the future"
            )
            .into(),
        );
        Err(err)
    }
}

/// Returns true when `date` lies in `[now - past_years, now + future_years]`.
pub fn is_within_window(
    date: &DateTime<Utc>,
    now: DateTime<Utc>,
    past_years: u32,
    future_years: u32,
) -> bool {
    let earliest = now.checked_sub_months(Months::new(past_years * 12));
    let latest = now.checked_add_months(Months::new(future_years * 12));
    match (earliest, latest) {
        (Some(earliest), Some(latest)) => *date >= earliest && *date <= latest,
        _ => false,
    }
}

/// Validates a value is not blank.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}
