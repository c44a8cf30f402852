//! Event aggregate.
//!
//! The event is mutated as one unit: every method either leaves the
//! aggregate untouched and returns an error, or applies the whole change.
//! `updated_at` doubles as the optimistic-lock token, so every successful
//! mutation advances it through [`Event::touch`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::validation::{is_within_window, PAST_WINDOW_YEARS, PUBLISH_FUTURE_WINDOW_YEARS};
use shared::{ClubId, Id, UserId};
use std::collections::HashSet;
use std::fmt;

use super::file::{CoverImage, File};
use super::patch::{EventPatch, UpdatePath};
use super::user::{Club, User};
use crate::error::DomainError;

/// Reason recorded when the owner pulls an event back from review.
pub const REVOKED_BY_OWNER_REASON: &str = "revoked by owner";

// ============================================================================
// Status and Type Enums
// ============================================================================

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    InProgress,
    Finished,
    Cancelled,
    Archived,
}

impl EventStatus {
    pub const ALL: [EventStatus; 8] = [
        EventStatus::Draft,
        EventStatus::Pending,
        EventStatus::Approved,
        EventStatus::Rejected,
        EventStatus::InProgress,
        EventStatus::Finished,
        EventStatus::Cancelled,
        EventStatus::Archived,
    ];

    /// Statuses anyone may read.
    pub const PUBLIC: [EventStatus; 3] = [
        EventStatus::InProgress,
        EventStatus::Finished,
        EventStatus::Cancelled,
    ];

    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "DRAFT",
            EventStatus::Pending => "PENDING",
            EventStatus::Approved => "APPROVED",
            EventStatus::Rejected => "REJECTED",
            EventStatus::InProgress => "IN_PROGRESS",
            EventStatus::Finished => "FINISHED",
            EventStatus::Cancelled => "CANCELLED",
            EventStatus::Archived => "ARCHIVED",
        }
    }

    /// The single transition table of the event lifecycle.
    pub fn can_transition_to(&self, target: EventStatus) -> bool {
        use EventStatus::*;
        match (self, target) {
            (Draft, InProgress) | (Draft, Pending) => true,
            (Pending, Draft) | (Pending, Approved) | (Pending, Rejected) => true,
            (Approved, InProgress) => true,
            (InProgress, Approved) | (InProgress, Draft) | (InProgress, Finished) => true,
            (Archived, _) => false,
            (Cancelled, Cancelled) => false,
            (_, Cancelled) | (_, Archived) => true,
            _ => false,
        }
    }

    pub fn is_public(&self) -> bool {
        Self::PUBLIC.contains(self)
    }

    /// Whether the owner may still edit the descriptive fields.
    pub fn is_editable(&self) -> bool {
        matches!(self, EventStatus::Draft | EventStatus::Rejected)
    }

    /// Whether the event no longer accepts staffing changes.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            EventStatus::Finished | EventStatus::Cancelled | EventStatus::Archived
        )
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Invalid event status: {}", s))
    }
}

/// Audience scope of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    IntraClub,
    University,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::IntraClub => "INTRA_CLUB",
            EventType::University => "UNIVERSITY",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INTRA_CLUB" => Ok(EventType::IntraClub),
            "UNIVERSITY" => Ok(EventType::University),
            _ => Err(format!(
                "Invalid event type: {}. Must be one of: INTRA_CLUB, UNIVERSITY",
                s
            )),
        }
    }
}

// ============================================================================
// Embedded Records
// ============================================================================

/// A user with managerial rights on an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organizer {
    pub user: User,
    /// The club this organizer represents.
    pub club_id: ClubId,
    pub invited_by_user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveMetadata {
    pub approved_by: User,
    pub approved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectMetadata {
    pub rejected_by: User,
    pub reason: String,
    pub rejected_at: DateTime<Utc>,
}

// ============================================================================
// Aggregate
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Id,
    pub owner_user_id: UserId,
    pub owner_club_id: ClubId,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub event_type: Option<EventType>,
    pub tags: Vec<String>,
    pub cover_images: Vec<CoverImage>,
    pub attached_images: Vec<File>,
    pub attached_files: Vec<File>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub location_link: String,
    pub location_university: String,
    pub collaborator_clubs: Vec<Club>,
    pub organizers: Vec<Organizer>,
    pub max_participants: i32,
    pub participants_count: i32,
    pub status: EventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approve_metadata: Option<ApproveMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_metadata: Option<RejectMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Truncates a timestamp to the microsecond precision the store keeps.
pub fn truncate_to_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(ts.timestamp_micros()).unwrap_or(ts)
}

impl Event {
    /// Creates a draft event owned by `owner` on behalf of `club`.
    ///
    /// The owner is the first organizer and is recorded as self-invited.
    pub fn new(id: Id, owner: User, club: &Club, now: DateTime<Utc>) -> Self {
        let now = truncate_to_micros(now);
        let owner_user_id = owner.id;
        Self {
            id,
            owner_user_id,
            owner_club_id: club.id,
            title: String::new(),
            description: String::new(),
            event_type: None,
            tags: Vec::new(),
            cover_images: Vec::new(),
            attached_images: Vec::new(),
            attached_files: Vec::new(),
            start_date: None,
            end_date: None,
            location_link: String::new(),
            location_university: String::new(),
            collaborator_clubs: Vec::new(),
            organizers: vec![Organizer {
                user: owner,
                club_id: club.id,
                invited_by_user_id: owner_user_id,
            }],
            max_participants: 0,
            participants_count: 0,
            status: EventStatus::Draft,
            approve_metadata: None,
            reject_metadata: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.owner_user_id == user_id
    }

    pub fn is_organizer(&self, user_id: UserId) -> bool {
        self.organizers.iter().any(|o| o.user.id == user_id)
    }

    pub fn organizer(&self, user_id: UserId) -> Option<&Organizer> {
        self.organizers.iter().find(|o| o.user.id == user_id)
    }

    pub fn is_collaborator(&self, club_id: ClubId) -> bool {
        self.collaborator_clubs.iter().any(|c| c.id == club_id)
    }

    /// Owner club plus every collaborator club.
    pub fn hosting_club_ids(&self) -> Vec<ClubId> {
        std::iter::once(self.owner_club_id)
            .chain(self.collaborator_clubs.iter().map(|c| c.id))
            .collect()
    }

    /// Advances `updated_at`, keeping it strictly increasing.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let now = truncate_to_micros(now);
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + chrono::Duration::microseconds(1)
        };
    }

    // ------------------------------------------------------------------------
    // Staffing
    // ------------------------------------------------------------------------

    pub fn add_organizer(&mut self, organizer: Organizer) -> Result<(), DomainError> {
        if self.is_organizer(organizer.user.id) {
            return Err(DomainError::UserAlreadyOrganizer);
        }
        if organizer.club_id != self.owner_club_id && !self.is_collaborator(organizer.club_id) {
            return Err(DomainError::ClubMismatch);
        }
        self.organizers.push(organizer);
        Ok(())
    }

    pub fn remove_organizer(&mut self, user_id: UserId) -> Result<Organizer, DomainError> {
        if self.organizers.is_empty() {
            return Err(DomainError::OrganizersEmpty);
        }
        if self.is_owner(user_id) {
            return Err(DomainError::UserIsEventOwner);
        }
        let index = self
            .organizers
            .iter()
            .position(|o| o.user.id == user_id)
            .ok_or(DomainError::OrganizerNotFound)?;
        Ok(self.organizers.remove(index))
    }

    /// Removes every non-owner organizer representing `club_id`.
    ///
    /// Returns the number of organizers removed.
    pub fn remove_organizers_by_club(&mut self, club_id: ClubId) -> Result<usize, DomainError> {
        if self.organizers.is_empty() {
            return Err(DomainError::OrganizersEmpty);
        }
        let owner = self.owner_user_id;
        let before = self.organizers.len();
        self.organizers
            .retain(|o| o.user.id == owner || o.club_id != club_id);
        Ok(before - self.organizers.len())
    }

    pub fn add_collaborator(&mut self, club: Club) -> Result<(), DomainError> {
        if club.id == self.owner_club_id {
            return Err(DomainError::ClubIsEventOwner);
        }
        if self.is_collaborator(club.id) {
            return Err(DomainError::ClubAlreadyCollaborator);
        }
        self.collaborator_clubs.push(club);
        Ok(())
    }

    /// Removes a collaborator club together with the organizers it supplied.
    pub fn remove_collaborator(&mut self, club_id: ClubId) -> Result<Club, DomainError> {
        if club_id == self.owner_club_id {
            return Err(DomainError::ClubIsEventOwner);
        }
        let index = self
            .collaborator_clubs
            .iter()
            .position(|c| c.id == club_id)
            .ok_or(DomainError::CollaboratorNotFound)?;
        let mut candidate = self.clone();
        let club = candidate.collaborator_clubs.remove(index);
        candidate.remove_organizers_by_club(club_id)?;
        *self = candidate;
        Ok(club)
    }

    // ------------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------------

    /// Applies the fields named in `paths` from `patch`.
    ///
    /// Fields are applied in a fixed priority order regardless of the order of
    /// `paths`. Returns whether anything changed; `updated_at` only advances
    /// on a real change.
    pub fn apply_update(
        &mut self,
        patch: &EventPatch,
        paths: &[UpdatePath],
        now: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        if paths.is_empty() {
            return Ok(false);
        }

        let mut candidate = self.clone();
        for path in UpdatePath::PRIORITY {
            if !paths.contains(&path) {
                continue;
            }
            match path {
                UpdatePath::Title => candidate.title = patch.title.clone(),
                UpdatePath::Description => candidate.description = patch.description.clone(),
                UpdatePath::Type => candidate.event_type = patch.event_type,
                UpdatePath::Tags => candidate.tags = normalize_tags(&patch.tags),
                UpdatePath::CoverImages => {
                    candidate.cover_images = normalize_cover_images(&patch.cover_images)?
                }
                UpdatePath::AttachedImages => {
                    candidate.attached_images = patch.attached_images.clone()
                }
                UpdatePath::AttachedFiles => candidate.attached_files = patch.attached_files.clone(),
                UpdatePath::StartDate => candidate.start_date = patch.start_date.map(truncate_to_micros),
                UpdatePath::EndDate => candidate.end_date = patch.end_date.map(truncate_to_micros),
                UpdatePath::LocationLink => candidate.location_link = patch.location_link.clone(),
                UpdatePath::LocationUniversity => {
                    candidate.location_university = patch.location_university.clone()
                }
                UpdatePath::MaxParticipants => {
                    candidate.max_participants = patch.max_participants
                }
            }
        }

        if let (Some(start), Some(end)) = (candidate.start_date, candidate.end_date) {
            if start > end {
                return Err(DomainError::InvalidArgument(
                    "start_date must not be after end_date".into(),
                ));
            }
        }
        if candidate.max_participants > 0 && candidate.participants_count > candidate.max_participants
        {
            return Err(DomainError::InvalidArgument(
                "max_participants is below the current participants count".into(),
            ));
        }

        if candidate == *self {
            return Ok(false);
        }
        candidate.touch(now);
        *self = candidate;
        Ok(true)
    }

    /// Checks the fields required before the event can go live.
    pub fn check_publishable(&self) -> Result<(), DomainError> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title".to_string());
        }
        if self.start_date.is_none() {
            missing.push("start_date".to_string());
        }
        if self.end_date.is_none() {
            missing.push("end_date".to_string());
        }
        if self.cover_images.is_empty() {
            missing.push("cover_images".to_string());
        }
        if self.event_type.is_none() {
            missing.push("type".to_string());
        }
        if !missing.is_empty() {
            return Err(DomainError::EventInvalidFields(missing));
        }
        Ok(())
    }

    /// Dates of a published event must lie within six years of `now`.
    fn check_publish_window(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        for date in [self.start_date, self.end_date].into_iter().flatten() {
            if !is_within_window(&date, now, PAST_WINDOW_YEARS, PUBLISH_FUTURE_WINDOW_YEARS) {
                return Err(DomainError::InvalidArgument(format!(
                    "event dates must be within {} years of now",
                    PUBLISH_FUTURE_WINDOW_YEARS
                )));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Moves to `target` if the transition table allows it.
    pub fn transition(&mut self, target: EventStatus, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.status.can_transition_to(target) {
            return Err(DomainError::InvalidEventStatus);
        }
        self.status = target;
        self.touch(now);
        Ok(())
    }

    /// Publishes a draft intra-club event or an approved university event.
    pub fn publish(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        match (self.status, self.event_type) {
            (EventStatus::Draft, Some(EventType::IntraClub)) | (EventStatus::Draft, None) => {
                self.check_publishable()?;
                self.check_publish_window(now)?;
            }
            (EventStatus::Approved, _) => self.check_publish_window(now)?,
            _ => return Err(DomainError::InvalidEventStatus),
        }
        self.transition(EventStatus::InProgress, now)
    }

    /// Takes a live event offline: back to approved for university events,
    /// back to draft for intra-club ones.
    pub fn unpublish(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != EventStatus::InProgress {
            return Err(DomainError::InvalidEventStatus);
        }
        let target = match self.event_type {
            Some(EventType::University) => EventStatus::Approved,
            _ => EventStatus::Draft,
        };
        self.transition(target, now)
    }

    pub fn send_to_review(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != EventStatus::Draft {
            return Err(DomainError::InvalidEventStatus);
        }
        self.check_publishable()?;
        if self.event_type != Some(EventType::University) {
            return Err(DomainError::InvalidEventStatus);
        }
        self.check_publish_window(now)?;
        self.transition(EventStatus::Pending, now)
    }

    /// Pulls a pending event back to draft, recording the owner as rejecter.
    pub fn revoke_review(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != EventStatus::Pending {
            return Err(DomainError::InvalidEventStatus);
        }
        let owner = self
            .organizer(self.owner_user_id)
            .map(|o| o.user.clone())
            .ok_or(DomainError::OrganizerNotFound)?;
        self.transition(EventStatus::Draft, now)?;
        self.reject_metadata = Some(RejectMetadata {
            rejected_by: owner,
            reason: REVOKED_BY_OWNER_REASON.to_string(),
            rejected_at: self.updated_at,
        });
        Ok(())
    }

    pub fn approve(&mut self, moderator: User, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != EventStatus::Pending {
            return Err(DomainError::InvalidEventStatus);
        }
        self.transition(EventStatus::Approved, now)?;
        self.approve_metadata = Some(ApproveMetadata {
            approved_by: moderator,
            approved_at: self.updated_at,
        });
        self.reject_metadata = None;
        Ok(())
    }

    pub fn reject(
        &mut self,
        moderator: User,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status != EventStatus::Pending {
            return Err(DomainError::InvalidEventStatus);
        }
        self.transition(EventStatus::Rejected, now)?;
        self.reject_metadata = Some(RejectMetadata {
            rejected_by: moderator,
            reason,
            rejected_at: self.updated_at,
        });
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(EventStatus::Cancelled, now)
    }

    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(EventStatus::Finished, now)
    }

    /// Soft delete: archive and stamp `deleted_at`.
    pub fn archive(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(EventStatus::Archived, now)?;
        self.deleted_at = Some(self.updated_at);
        Ok(())
    }

    /// Whether an in-progress event has run past its end date.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == EventStatus::InProgress && self.end_date.is_some_and(|end| end < now)
    }

    // ------------------------------------------------------------------------
    // Capacity
    // ------------------------------------------------------------------------

    pub fn has_capacity(&self) -> bool {
        self.max_participants == 0 || self.participants_count < self.max_participants
    }

    pub fn join(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.has_capacity() {
            return Err(DomainError::EventIsFull);
        }
        self.participants_count += 1;
        self.touch(now);
        Ok(())
    }

    pub fn leave(&mut self, now: DateTime<Utc>) {
        self.participants_count = (self.participants_count - 1).max(0);
        self.touch(now);
    }
}

/// Trims tags and drops duplicates, keeping first occurrences.
fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
        .collect()
}

/// Orders cover images by position, rejecting duplicate positions.
fn normalize_cover_images(images: &[CoverImage]) -> Result<Vec<CoverImage>, DomainError> {
    let mut positions = HashSet::new();
    for image in images {
        if !positions.insert(image.position) {
            return Err(DomainError::InvalidArgument(format!(
                "duplicate cover image position {}",
                image.position
            )));
        }
    }
    let mut sorted = images.to_vec();
    sorted.sort_by_key(|image| image.position);
    Ok(sorted)
}
