//! Core domain types for the commit feed.
//!
//! This module contains the identifiers and records shared by the ingestion
//! pipeline, the store, and the HTTP layer.

pub mod commit;
pub mod ids;
pub mod project;

pub use commit::{Author, ChangeKind, Commit, FileChange, LineStats, VoteKind, Votes};
pub use ids::{InvalidProjectId, InvalidSha, MAX_SHA_LEN, ProjectId, Sha};
pub use project::{NewProject, Project, ProjectUpdate, ProjectView};
