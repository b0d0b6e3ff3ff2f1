//! Push event payload schema.
//!
//! Only the fields the ingestion pipeline reads are modeled; unknown fields
//! are ignored. The top level must carry a `ref` string and a `commits`
//! array. Individual commit entries are kept as raw JSON here and decoded one
//! at a time by the normalizer, so a single malformed entry cannot fail the
//! whole delivery.
//!
//! # Headers
//!
//! - `X-GitHub-Event` - Event kind; only `push` is ingested
//! - `X-GitHub-Delivery` - Delivery ID (logged only)
//! - `X-Hub-Signature-256` - HMAC-SHA256 signature (verified elsewhere)

use serde::Deserialize;
use thiserror::Error;

/// Event kind header value for push events.
pub const PUSH_EVENT: &str = "push";

/// Reference namespace stripped from `ref` to obtain the branch name.
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Error type for push payload parsing failures.
#[derive(Debug, Error)]
pub enum PushParseError {
    /// Body is not JSON, or lacks `ref` / `commits` with the right types.
    #[error("malformed push payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Classification of the `X-GitHub-Event` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Push,
    /// Any other event; acknowledged without processing.
    Other(String),
    /// Header absent.
    Missing,
}

impl EventKind {
    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            Some(PUSH_EVENT) => EventKind::Push,
            Some(other) => EventKind::Other(other.to_string()),
            None => EventKind::Missing,
        }
    }
}

/// Repository descriptor carried by a push payload. Used for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PushRepository {
    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
}

impl PushRepository {
    /// Best available human-readable name.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("<unknown>")
    }
}

/// A push event, validated at the top level only.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,

    #[serde(default)]
    pub repository: PushRepository,

    /// Provider commit entries, oldest first.
    pub commits: Vec<serde_json::Value>,
}

impl PushEvent {
    /// Branch name with the `refs/heads/` namespace removed.
    ///
    /// Refs outside that namespace (tags, notes) are returned verbatim.
    pub fn branch(&self) -> &str {
        self.git_ref
            .strip_prefix(BRANCH_REF_PREFIX)
            .unwrap_or(&self.git_ref)
    }
}

/// One entry of the `commits` array, as sent by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPushCommit {
    pub id: String,
    pub message: String,
    pub author: RawAuthor,
    pub timestamp: String,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub added: Vec<String>,

    #[serde(default)]
    pub removed: Vec<String>,

    #[serde(default)]
    pub modified: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAuthor {
    pub name: String,
    pub email: String,

    #[serde(default)]
    pub username: Option<String>,
}

/// Parses a push payload from the raw request body.
///
/// ```
/// use commit_feed::webhooks::parse_push_event;
///
/// let event = parse_push_event(br#"{"ref": "refs/heads/main", "commits": []}"#).unwrap();
/// assert_eq!(event.branch(), "main");
/// ```
pub fn parse_push_event(payload: &[u8]) -> Result<PushEvent, PushParseError> {
    Ok(serde_json::from_slice(payload)?)
}
