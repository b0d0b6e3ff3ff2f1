//! Stored commit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ProjectId, Sha};

/// How a file was touched by a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

impl ChangeKind {
    /// Returns the kind that wins when a filename appears in more than one list.
    ///
    /// Precedence is `Modified` > `Removed` > `Added`.
    pub fn precedence(self, other: ChangeKind) -> ChangeKind {
        self.max(other)
    }
}

/// A single file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub filename: String,

    #[serde(rename = "status")]
    pub kind: ChangeKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additions: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletions: Option<u64>,
}

impl FileChange {
    pub fn new(filename: impl Into<String>, kind: ChangeKind) -> Self {
        FileChange {
            filename: filename.into(),
            kind,
            additions: None,
            deletions: None,
        }
    }
}

/// Line-change totals for a commit, when the provider reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineStats {
    pub additions: u64,
    pub deletions: u64,
    pub total: u64,
}

/// Commit author as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Avatar image URL, derived from `username`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Which vote counter to bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Up,
    Down,
}

/// Vote tally for a commit. Both counters only ever increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Votes {
    pub up: u64,
    pub down: u64,
}

impl Votes {
    /// Bumps the selected counter by one, saturating at `u64::MAX`.
    pub fn record(&mut self, kind: VoteKind) {
        match kind {
            VoteKind::Up => self.up = self.up.saturating_add(1),
            VoteKind::Down => self.down = self.down.saturating_add(1),
        }
    }
}

/// A commit as persisted in the store.
///
/// Created once by the ingestion pipeline; afterwards only `votes` changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: Sha,
    pub message: String,
    pub author: Author,
    pub project_id: ProjectId,
    pub branch: String,

    /// Author time reported by the provider, not ingestion time.
    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub files_changed: Vec<FileChange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<LineStats>,

    #[serde(default)]
    pub votes: Votes,

    /// When this record was first written.
    pub created_at: DateTime<Utc>,
}
