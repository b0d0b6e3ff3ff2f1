//! Per-request and per-commit ingestion results.
//!
//! These never reach the webhook sender. They exist so that every request's
//! partial failures are visible in the logs.

use std::fmt;

use crate::types::{ProjectId, Sha};

/// Why a commit entry was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The entry could not be normalized (bad shape, id, or timestamp).
    Normalize(String),
    /// The store failed to write the commit.
    Storage(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Normalize(msg) => write!(f, "normalize: {msg}"),
            SkipReason::Storage(msg) => write!(f, "storage: {msg}"),
        }
    }
}

/// What happened to one entry of a push event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Stored and counted.
    Inserted(Sha),

    /// Stored, but the project aggregate update failed.
    AggregateFailed { sha: Sha, error: String },

    /// Already stored by an earlier delivery; nothing changed.
    AlreadyExists(Sha),

    /// Not stored.
    Skipped {
        index: usize,
        sha: Option<Sha>,
        reason: SkipReason,
    },
}

impl CommitOutcome {
    /// True when this entry created a new commit record.
    pub fn is_new(&self) -> bool {
        matches!(
            self,
            CommitOutcome::Inserted(_) | CommitOutcome::AggregateFailed { .. }
        )
    }
}

/// How the request's event was handled as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDisposition {
    /// A push event whose commits were processed.
    Processed,
    /// Not a push event; acknowledged without processing.
    IgnoredEvent(Option<String>),
    /// A push event whose body did not match the push schema.
    InvalidPayload(String),
}

/// Summary of one ingestion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub project_id: ProjectId,
    pub disposition: EventDisposition,
    pub outcomes: Vec<CommitOutcome>,
}

/// Counts per outcome kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub inserted: usize,
    pub aggregate_failed: usize,
    pub already_exists: usize,
    pub skipped: usize,
}

impl IngestReport {
    pub fn new(project_id: ProjectId, disposition: EventDisposition) -> Self {
        IngestReport {
            project_id,
            disposition,
            outcomes: Vec::new(),
        }
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for outcome in &self.outcomes {
            match outcome {
                CommitOutcome::Inserted(_) => counts.inserted += 1,
                CommitOutcome::AggregateFailed { .. } => counts.aggregate_failed += 1,
                CommitOutcome::AlreadyExists(_) => counts.already_exists += 1,
                CommitOutcome::Skipped { .. } => counts.skipped += 1,
            }
        }
        counts
    }

    /// Revision hashes that were newly stored by this request.
    pub fn new_shas(&self) -> impl Iterator<Item = &Sha> {
        self.outcomes.iter().filter_map(|o| match o {
            CommitOutcome::Inserted(sha) | CommitOutcome::AggregateFailed { sha, .. } => Some(sha),
            _ => None,
        })
    }
}
