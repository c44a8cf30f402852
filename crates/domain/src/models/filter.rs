//! Event list filters and ordering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{ClubId, UserId};
use std::cmp::Ordering;

use super::event::{Event, EventStatus};
use crate::error::DomainError;

/// Criteria an event must satisfy to be listed.
///
/// Every set field narrows the result. When `hide_private` is set, intra-club
/// events are only returned for clubs in `visible_club_ids`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub club_id: Option<ClubId>,
    pub owner_user_id: Option<UserId>,
    pub organizer_user_id: Option<UserId>,
    /// Any-of match.
    pub tags: Vec<String>,
    pub starts_after: Option<DateTime<Utc>>,
    pub starts_before: Option<DateTime<Utc>>,
    pub ends_before: Option<DateTime<Utc>>,
    pub statuses: Vec<EventStatus>,
    pub hide_private: bool,
    pub visible_club_ids: Vec<ClubId>,
}

impl EventFilter {
    /// In-memory evaluation, mirroring the SQL the store builds.
    pub fn matches(&self, event: &Event) -> bool {
        if event.deleted_at.is_some() {
            return false;
        }
        if let Some(club_id) = self.club_id {
            if event.owner_club_id != club_id && !event.is_collaborator(club_id) {
                return false;
            }
        }
        if let Some(owner) = self.owner_user_id {
            if event.owner_user_id != owner {
                return false;
            }
        }
        if let Some(organizer) = self.organizer_user_id {
            if !event.is_organizer(organizer) {
                return false;
            }
        }
        if !self.tags.is_empty() && !event.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        if let Some(after) = self.starts_after {
            if event.start_date.map_or(true, |start| start < after) {
                return false;
            }
        }
        if let Some(before) = self.starts_before {
            if event.start_date.map_or(true, |start| start > before) {
                return false;
            }
        }
        if let Some(before) = self.ends_before {
            if event.end_date.map_or(true, |end| end > before) {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&event.status) {
            return false;
        }
        if self.hide_private
            && event.event_type != Some(super::event::EventType::University)
            && !event
                .hosting_club_ids()
                .iter()
                .any(|id| self.visible_club_ids.contains(id))
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Date,
    Participants,
    Type,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for SortBy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "date" => Ok(SortBy::Date),
            "participants" => Ok(SortBy::Participants),
            "type" => Ok(SortBy::Type),
            _ => Err(DomainError::InvalidArgument(format!(
                "sort_by must be one of: date, participants, type (got {})",
                s
            ))),
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(DomainError::InvalidArgument(format!(
                "sort_order must be one of: asc, desc (got {})",
                s
            ))),
        }
    }
}

/// Ordering of a listing. Ties break on event id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventOrder {
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl EventOrder {
    /// Resolves raw query parameters.
    ///
    /// No parameters means start date ascending. A sort key without an
    /// explicit order sorts descending.
    pub fn from_params(
        sort_by: Option<&str>,
        sort_order: Option<&str>,
    ) -> Result<Self, DomainError> {
        let order = match (sort_by, sort_order) {
            (None, None) => EventOrder::default(),
            (by, order) => EventOrder {
                sort_by: by.map(str::parse).transpose()?.unwrap_or_default(),
                sort_order: order.map(str::parse).transpose()?.unwrap_or(SortOrder::Desc),
            },
        };
        Ok(order)
    }

    /// Compares two events the way the store orders them.
    pub fn compare(&self, a: &Event, b: &Event) -> Ordering {
        let primary = match self.sort_by {
            SortBy::Date => a.start_date.cmp(&b.start_date),
            SortBy::Participants => a.participants_count.cmp(&b.participants_count),
            SortBy::Type => a
                .event_type
                .map(|t| t.as_str())
                .cmp(&b.event_type.map(|t| t.as_str())),
        };
        let primary = match self.sort_order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.as_str().cmp(b.id.as_str()))
    }
}
