//! Recomputes project aggregates from stored commits.
//!
//! Aggregates are updated after, not together with, commit inserts, so a
//! failed or interrupted update leaves them behind the commit store.
//! Reconciliation overwrites them with values derived from the commits.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::store::{CommitFilter, Store, StoreError};
use crate::types::ProjectId;

/// Aggregate values before and after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub project_id: ProjectId,
    pub previous_total: u64,
    pub total_commits: u64,
    pub previous_last_commit_at: Option<DateTime<Utc>>,
    pub last_commit_at: Option<DateTime<Utc>>,
}

impl Reconciliation {
    pub fn changed(&self) -> bool {
        self.previous_total != self.total_commits
            || self.previous_last_commit_at != self.last_commit_at
    }
}

/// Reconciles one project. Returns `None` for an unknown project.
pub fn reconcile_project(
    store: &dyn Store,
    project_id: &ProjectId,
) -> Result<Option<Reconciliation>, StoreError> {
    let Some(project) = store.get_project(project_id)? else {
        return Ok(None);
    };

    let commits = store.commits(&CommitFilter::for_project(project_id.clone()))?;
    let total_commits = commits.len() as u64;
    let last_commit_at = commits.iter().map(|c| c.timestamp).max();

    store.set_aggregate(project_id, total_commits, last_commit_at)?;

    let result = Reconciliation {
        project_id: project_id.clone(),
        previous_total: project.total_commits,
        total_commits,
        previous_last_commit_at: project.last_commit_at,
        last_commit_at,
    };
    if result.changed() {
        warn!(
            project_id = %project_id,
            previous_total = result.previous_total,
            total_commits,
            "Aggregate drift repaired"
        );
    } else {
        info!(project_id = %project_id, total_commits, "Aggregate already consistent");
    }
    Ok(Some(result))
}

/// Reconciles every project, active or not.
pub fn reconcile_all(store: &dyn Store) -> Result<Vec<Reconciliation>, StoreError> {
    let mut results = Vec::new();
    for project in store.list_projects()? {
        if let Some(result) = reconcile_project(store, &project.id)? {
            results.push(result);
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_utils::{sample_commit, sample_project};
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn repairs_missing_aggregate_updates() {
        let store = MemoryStore::new();
        let project = store.create_project(sample_project("demo", None)).unwrap();
        let other = store.create_project(sample_project("other", None)).unwrap();

        // Inserted without aggregate updates, as after a failed update.
        for (sha, day) in [("a", 3), ("b", 9), ("c", 5)] {
            store
                .insert_commit_if_absent(sample_commit(sha, &project.id, at(day)))
                .unwrap();
        }
        store
            .insert_commit_if_absent(sample_commit("z", &other.id, at(20)))
            .unwrap();

        let result = reconcile_project(&store, &project.id).unwrap().unwrap();
        assert!(result.changed());
        assert_eq!(result.previous_total, 0);
        assert_eq!(result.total_commits, 3);
        assert_eq!(result.last_commit_at, Some(at(9)));

        let stored = store.get_project(&project.id).unwrap().unwrap();
        assert_eq!(stored.total_commits, 3);
        assert_eq!(stored.last_commit_at, Some(at(9)));
    }

    #[test]
    fn consistent_project_is_unchanged() {
        let store = MemoryStore::new();
        let project = store.create_project(sample_project("demo", None)).unwrap();
        store
            .insert_commit_if_absent(sample_commit("a", &project.id, at(1)))
            .unwrap();
        store.apply_aggregate(&project.id, at(1)).unwrap();

        let result = reconcile_project(&store, &project.id).unwrap().unwrap();
        assert!(!result.changed());
    }

    #[test]
    fn unknown_project_is_none() {
        let store = MemoryStore::new();
        let id = ProjectId::parse("ghost").unwrap();
        assert_eq!(reconcile_project(&store, &id).unwrap(), None);
    }

    #[test]
    fn reconcile_all_covers_every_project() {
        let store = MemoryStore::new();
        store.create_project(sample_project("a", None)).unwrap();
        store.create_project(sample_project("b", None)).unwrap();
        assert_eq!(reconcile_all(&store).unwrap().len(), 2);
    }
}
