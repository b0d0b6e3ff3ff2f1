//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., using a
//! project ID where a revision hash is expected) and make the code more
//! self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum accepted length of a revision hash.
///
/// SHA-1 object names are 40 hex characters and SHA-256 ones are 64; the
/// extra headroom covers providers that use longer opaque identifiers.
pub const MAX_SHA_LEN: usize = 128;

/// Error returned when a string is not an acceptable revision hash.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid revision hash: {0:?}")]
pub struct InvalidSha(pub String);

/// A source-control revision hash.
///
/// This is the idempotency key for ingestion: at most one commit with a given
/// `Sha` exists in the store. Because it is also used as a file name by the
/// durable store, only non-empty ASCII alphanumeric strings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha(String);

impl Sha {
    /// Parses a revision hash, rejecting empty, overlong, or non-alphanumeric input.
    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidSha> {
        let s = s.into();
        if s.is_empty() || s.len() > MAX_SHA_LEN || !s.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(InvalidSha(s));
        }
        Ok(Sha(s))
    }

    /// Returns the SHA as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short (7-character) version of the SHA for display.
    pub fn short(&self) -> &str {
        // Always ASCII after `parse`, so byte slicing is safe.
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Sha {
    type Error = InvalidSha;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Sha::parse(s)
    }
}

impl From<Sha> for String {
    fn from(sha: Sha) -> Self {
        sha.0
    }
}

/// Error returned when a string is not a well-formed project identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid project id: {0:?}")]
pub struct InvalidProjectId(pub String);

/// An opaque project identifier.
///
/// New identifiers are random UUIDs rendered in hyphenated lowercase form.
/// Parsing accepts anything made of ASCII alphanumerics and `-`, so that
/// identifiers are always safe to embed in URLs and file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        ProjectId(uuid::Uuid::new_v4().to_string())
    }

    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidProjectId> {
        let s = s.into();
        if s.is_empty() || s.len() > 64 || !s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        {
            return Err(InvalidProjectId(s));
        }
        Ok(ProjectId(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = InvalidProjectId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ProjectId::parse(s)
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}
