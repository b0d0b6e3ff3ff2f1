//! Storage for projects and commits.
//!
//! All mutation performed by the ingestion pipeline goes through two atomic
//! operations of the [`Store`] trait:
//!
//! - [`Store::insert_commit_if_absent`] - the uniqueness constraint on the
//!   revision hash lives here, inside the store, so concurrent deliveries of
//!   the same commit see exactly one [`InsertOutcome::Inserted`]
//! - [`Store::apply_aggregate`] - increment-and-max of a project's counters,
//!   performed atomically by the store rather than as an application-level
//!   read-modify-write
//!
//! # Backends
//!
//! - [`MemoryStore`] keeps everything in process memory.
//! - [`FileStore`] persists JSON records under a data directory:
//!
//! ```text
//! <data_dir>/
//!   projects/<project-id>.json
//!   commits/<sha>.json
//! ```

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{Commit, Project, ProjectId, ProjectUpdate, Sha, VoteKind, Votes};

pub mod file;
pub mod fsync;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Another project already uses this name.
    #[error("project name already exists: {0}")]
    DuplicateName(String),

    /// The project referenced by an aggregate update does not exist.
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    /// A lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Outcome of an insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new record was created.
    Inserted,
    /// A record with the same revision hash already existed; nothing changed.
    AlreadyExists,
}

/// Selection criteria for commit queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitFilter {
    pub project_id: Option<ProjectId>,

    /// Inclusive timestamp bounds.
    pub range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl CommitFilter {
    pub fn for_project(project_id: ProjectId) -> Self {
        CommitFilter {
            project_id: Some(project_id),
            range: None,
        }
    }

    pub fn matches(&self, commit: &Commit) -> bool {
        let project_ok = self
            .project_id
            .as_ref()
            .is_none_or(|id| &commit.project_id == id);
        let range_ok = self
            .range
            .is_none_or(|(start, end)| start <= commit.timestamp && commit.timestamp <= end);
        project_ok && range_ok
    }
}

/// Orders commits newest first; ties broken by revision hash for stable pages.
pub fn sort_newest_first(commits: &mut [Commit]) {
    commits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.sha.cmp(&b.sha)));
}

/// Orders projects newest first.
pub fn sort_projects_newest_first(projects: &mut [Project]) {
    projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Storage contract shared by the ingestion pipeline and the read APIs.
///
/// Implementations must be safe to call from many threads at once. Every
/// method is a single atomic operation from the caller's point of view.
pub trait Store: Send + Sync {
    /// Looks up a project by id, including its secret.
    fn get_project(&self, id: &ProjectId) -> Result<Option<Project>>;

    /// Returns all projects, active or not, newest first.
    fn list_projects(&self) -> Result<Vec<Project>>;

    /// Persists a new project.
    ///
    /// Fails with [`StoreError::DuplicateName`] if the name is taken by any
    /// project, active or inactive.
    fn create_project(&self, project: Project) -> Result<Project>;

    /// Applies a partial update. Returns `None` for an unknown id.
    ///
    /// Never touches the aggregate fields.
    fn update_project(&self, id: &ProjectId, update: ProjectUpdate) -> Result<Option<Project>>;

    /// Inserts `commit` unless a commit with the same revision hash exists.
    fn insert_commit_if_absent(&self, commit: Commit) -> Result<InsertOutcome>;

    /// Atomically adds one to the project's commit count and raises
    /// `last_commit_at` to `timestamp` if that is later.
    fn apply_aggregate(&self, id: &ProjectId, timestamp: DateTime<Utc>) -> Result<()>;

    /// Overwrites a project's aggregates. Used by reconciliation only.
    fn set_aggregate(
        &self,
        id: &ProjectId,
        total_commits: u64,
        last_commit_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    fn get_commit(&self, sha: &Sha) -> Result<Option<Commit>>;

    /// Atomically bumps one vote counter. Returns `None` for an unknown commit.
    fn increment_vote(&self, sha: &Sha, kind: VoteKind) -> Result<Option<Votes>>;

    /// Returns all matching commits, newest first.
    fn commits(&self, filter: &CommitFilter) -> Result<Vec<Commit>>;
}
