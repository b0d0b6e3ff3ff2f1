//! In-process store.
//!
//! A single mutex guards both maps. It is held only for the duration of one
//! trait method, which is what makes each method atomic.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{
    CommitFilter, InsertOutcome, Result, Store, StoreError, sort_newest_first,
    sort_projects_newest_first,
};
use crate::types::{Commit, Project, ProjectId, ProjectUpdate, Sha, VoteKind, Votes};

#[derive(Debug, Default)]
struct Inner {
    projects: HashMap<ProjectId, Project>,
    commits: HashMap<Sha, Commit>,
}

impl Inner {
    fn name_taken(&self, name: &str, except: Option<&ProjectId>) -> bool {
        self.projects
            .values()
            .any(|p| p.name == name && Some(&p.id) != except)
    }
}

/// Store backed by process memory. Contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl Store for MemoryStore {
    fn get_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        Ok(self.lock()?.projects.get(id).cloned())
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = self.lock()?.projects.values().cloned().collect();
        sort_projects_newest_first(&mut projects);
        Ok(projects)
    }

    fn create_project(&self, project: Project) -> Result<Project> {
        let mut inner = self.lock()?;
        if inner.name_taken(&project.name, None) {
            return Err(StoreError::DuplicateName(project.name));
        }
        inner.projects.insert(project.id.clone(), project.clone());
        Ok(project)
    }

    fn update_project(&self, id: &ProjectId, update: ProjectUpdate) -> Result<Option<Project>> {
        let mut inner = self.lock()?;
        if let Some(name) = &update.name {
            if inner.name_taken(name, Some(id)) {
                return Err(StoreError::DuplicateName(name.clone()));
            }
        }
        let Some(project) = inner.projects.get_mut(id) else {
            return Ok(None);
        };
        project.apply_update(update);
        Ok(Some(project.clone()))
    }

    fn insert_commit_if_absent(&self, commit: Commit) -> Result<InsertOutcome> {
        let mut inner = self.lock()?;
        match inner.commits.entry(commit.sha.clone()) {
            Entry::Occupied(_) => Ok(InsertOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(commit);
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    fn apply_aggregate(&self, id: &ProjectId, timestamp: DateTime<Utc>) -> Result<()> {
        let mut inner = self.lock()?;
        let project = inner
            .projects
            .get_mut(id)
            .ok_or_else(|| StoreError::ProjectNotFound(id.clone()))?;
        project.record_commit(timestamp);
        Ok(())
    }

    fn set_aggregate(
        &self,
        id: &ProjectId,
        total_commits: u64,
        last_commit_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        let project = inner
            .projects
            .get_mut(id)
            .ok_or_else(|| StoreError::ProjectNotFound(id.clone()))?;
        project.total_commits = total_commits;
        project.last_commit_at = last_commit_at;
        Ok(())
    }

    fn get_commit(&self, sha: &Sha) -> Result<Option<Commit>> {
        Ok(self.lock()?.commits.get(sha).cloned())
    }

    fn increment_vote(&self, sha: &Sha, kind: VoteKind) -> Result<Option<Votes>> {
        let mut inner = self.lock()?;
        Ok(inner.commits.get_mut(sha).map(|commit| {
            commit.votes.record(kind);
            commit.votes
        }))
    }

    fn commits(&self, filter: &CommitFilter) -> Result<Vec<Commit>> {
        let mut commits: Vec<Commit> = self
            .lock()?
            .commits
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        sort_newest_first(&mut commits);
        Ok(commits)
    }
}
