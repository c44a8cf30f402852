//! Identifier types.
//!
//! Entities owned by this service (events, invites, participants) use a
//! 24-character lowercase hex identifier: 4 bytes of creation time followed
//! by 8 random bytes. Users and clubs are identified by the numeric ids of
//! the upstream directory services.

use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Numeric identifier of a user, supplied by the user directory.
pub type UserId = i64;

/// Numeric identifier of a club, supplied by the club directory.
pub type ClubId = i64;

/// Length of the hex representation of an [`Id`].
pub const ID_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("id must be {ID_LEN} characters, got {0}")]
    InvalidLength(usize),
    #[error("id must be hexadecimal")]
    InvalidCharacters,
}

/// Opaque identifier of an aggregate-internal entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Id(String);

impl Id {
    /// Generates a fresh identifier.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        let secs = Utc::now().timestamp() as u32;
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        rand::thread_rng().fill_bytes(&mut bytes[4..]);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Id {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ID_LEN {
            return Err(IdError::InvalidLength(s.len()));
        }
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(IdError::InvalidCharacters);
        }
        Ok(Self(s.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for Id {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Id> for String {
    fn from(id: Id) -> Self {
        id.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
