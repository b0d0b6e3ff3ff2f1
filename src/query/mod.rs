//! Read-side views over stored commits: pagination, date ranges, and stats.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::{Commit, Project, ProjectId};

pub mod pagination;
pub mod range;
pub mod stats;

pub use pagination::{DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT, PageParams, PageRequest, Pagination, paginate};
pub use range::{Bound, DateRangeParams, InvalidDate, parse_bound};
pub use stats::{CommitStats, ProjectStats, commit_stats, project_stats};

/// A commit joined with its project's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitView {
    #[serde(flatten)]
    pub commit: Commit,

    /// `None` if the project record is gone.
    pub project_name: Option<String>,
}

/// Attaches project names, preserving commit order.
pub fn with_project_names(commits: Vec<Commit>, projects: &[Project]) -> Vec<CommitView> {
    let names: HashMap<&ProjectId, &str> = projects
        .iter()
        .map(|p| (&p.id, p.name.as_str()))
        .collect();
    commits
        .into_iter()
        .map(|commit| {
            let project_name = names.get(&commit.project_id).map(|n| n.to_string());
            CommitView {
                commit,
                project_name,
            }
        })
        .collect()
}
