//! File-backed store.
//!
//! Every record is one pretty-printed JSON file. All records are loaded into
//! memory on [`FileStore::open`]; reads are served from memory and writes go
//! to disk before the in-memory view is updated.
//!
//! # Concurrency
//!
//! - Commit uniqueness is enforced by the filesystem: a commit file is
//!   published with [`publish_new`], which fails atomically when
//!   `commits/<sha>.json` already exists.
//! - Each project sits behind its own mutex, so aggregate updates for one
//!   project are serialized without blocking other projects.
//! - Creating or renaming a project takes the project map's write lock, which
//!   keeps the name check and the write together.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::fsync::{is_temp_name, publish_new, remove_stale_temps, write_atomic};
use super::{
    CommitFilter, InsertOutcome, Result, Store, StoreError, sort_newest_first,
    sort_projects_newest_first,
};
use crate::types::{Commit, Project, ProjectId, ProjectUpdate, Sha, VoteKind, Votes};

const PROJECTS_DIR: &str = "projects";
const COMMITS_DIR: &str = "commits";

type ProjectMap = HashMap<ProjectId, Arc<Mutex<Project>>>;

/// Durable store rooted at a data directory.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    projects: RwLock<ProjectMap>,
    commits: RwLock<HashMap<Sha, Commit>>,
}

impl FileStore {
    /// Opens (creating if needed) a store under `root` and loads all records.
    ///
    /// Temp files left by interrupted writers are removed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let projects_dir = root.join(PROJECTS_DIR);
        let commits_dir = root.join(COMMITS_DIR);
        std::fs::create_dir_all(&projects_dir)?;
        std::fs::create_dir_all(&commits_dir)?;

        for dir in [&projects_dir, &commits_dir] {
            let removed = remove_stale_temps(dir)?;
            if removed > 0 {
                warn!(dir = %dir.display(), removed, "Removed interrupted writes");
            }
        }

        let projects: ProjectMap = load_records::<Project>(&projects_dir)?
            .into_iter()
            .map(|p| (p.id.clone(), Arc::new(Mutex::new(p))))
            .collect();
        let commits: HashMap<Sha, Commit> = load_records::<Commit>(&commits_dir)?
            .into_iter()
            .map(|c| (c.sha.clone(), c))
            .collect();

        info!(
            root = %root.display(),
            projects = projects.len(),
            commits = commits.len(),
            "Opened file store"
        );

        Ok(FileStore {
            root,
            projects: RwLock::new(projects),
            commits: RwLock::new(commits),
        })
    }

    /// Returns the data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_path(&self, id: &ProjectId) -> PathBuf {
        self.root
            .join(PROJECTS_DIR)
            .join(format!("{}.json", id.as_str()))
    }

    fn commit_path(&self, sha: &Sha) -> PathBuf {
        self.root
            .join(COMMITS_DIR)
            .join(format!("{}.json", sha.as_str()))
    }

    fn read_projects(&self) -> Result<RwLockReadGuard<'_, ProjectMap>> {
        self.projects.read().map_err(|_| StoreError::Poisoned)
    }

    fn write_projects(&self) -> Result<RwLockWriteGuard<'_, ProjectMap>> {
        self.projects.write().map_err(|_| StoreError::Poisoned)
    }

    fn read_commits(&self) -> Result<RwLockReadGuard<'_, HashMap<Sha, Commit>>> {
        self.commits.read().map_err(|_| StoreError::Poisoned)
    }

    fn write_commits(&self) -> Result<RwLockWriteGuard<'_, HashMap<Sha, Commit>>> {
        self.commits.write().map_err(|_| StoreError::Poisoned)
    }

    fn project_handle(&self, id: &ProjectId) -> Result<Option<Arc<Mutex<Project>>>> {
        Ok(self.read_projects()?.get(id).cloned())
    }

    /// Runs `mutate` on a copy of the project, persists it, then commits it
    /// to memory. The project's mutex is held throughout.
    fn modify_project<F>(&self, id: &ProjectId, mutate: F) -> Result<Option<Project>>
    where
        F: FnOnce(&mut Project),
    {
        let Some(handle) = self.project_handle(id)? else {
            return Ok(None);
        };
        let mut current = lock(&handle)?;
        let mut updated = current.clone();
        mutate(&mut updated);
        write_atomic(&self.project_path(id), &to_json(&updated)?)?;
        *current = updated.clone();
        Ok(Some(updated))
    }

    fn name_taken(projects: &ProjectMap, name: &str, except: Option<&ProjectId>) -> Result<bool> {
        for (id, handle) in projects {
            if Some(id) == except {
                continue;
            }
            if lock(handle)?.name == name {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn lock(handle: &Mutex<Project>) -> Result<MutexGuard<'_, Project>> {
    handle.lock().map_err(|_| StoreError::Poisoned)
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(value)?)
}

/// Loads every `*.json` record in `dir`, skipping temp files.
fn load_records<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut records = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if is_temp_name(name) || !name.ends_with(".json") {
            continue;
        }
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        records.push(serde_json::from_slice(&bytes)?);
    }
    Ok(records)
}

impl Store for FileStore {
    fn get_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        let Some(handle) = self.project_handle(id)? else {
            return Ok(None);
        };
        let project = lock(&handle)?.clone();
        Ok(Some(project))
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let projects = self.read_projects()?;
        let mut list = Vec::with_capacity(projects.len());
        for handle in projects.values() {
            list.push(lock(handle)?.clone());
        }
        sort_projects_newest_first(&mut list);
        Ok(list)
    }

    fn create_project(&self, project: Project) -> Result<Project> {
        let mut projects = self.write_projects()?;
        if Self::name_taken(&projects, &project.name, None)? {
            return Err(StoreError::DuplicateName(project.name));
        }
        write_atomic(&self.project_path(&project.id), &to_json(&project)?)?;
        projects.insert(project.id.clone(), Arc::new(Mutex::new(project.clone())));
        debug!(project_id = %project.id, name = %project.name, "Created project");
        Ok(project)
    }

    fn update_project(&self, id: &ProjectId, update: ProjectUpdate) -> Result<Option<Project>> {
        // Held so that no concurrent create or rename can claim the same name.
        let projects = self.write_projects()?;
        if let Some(name) = &update.name {
            if Self::name_taken(&projects, name, Some(id))? {
                return Err(StoreError::DuplicateName(name.clone()));
            }
        }
        let Some(handle) = projects.get(id) else {
            return Ok(None);
        };

        let mut current = lock(handle)?;
        let mut updated = current.clone();
        updated.apply_update(update);
        write_atomic(&self.project_path(id), &to_json(&updated)?)?;
        *current = updated.clone();
        Ok(Some(updated))
    }

    fn insert_commit_if_absent(&self, commit: Commit) -> Result<InsertOutcome> {
        if self.read_commits()?.contains_key(&commit.sha) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        if !publish_new(&self.commit_path(&commit.sha), &to_json(&commit)?)? {
            return Ok(InsertOutcome::AlreadyExists);
        }
        self.write_commits()?.insert(commit.sha.clone(), commit);
        Ok(InsertOutcome::Inserted)
    }

    fn apply_aggregate(&self, id: &ProjectId, timestamp: DateTime<Utc>) -> Result<()> {
        self.modify_project(id, |p| p.record_commit(timestamp))?
            .map(|_| ())
            .ok_or_else(|| StoreError::ProjectNotFound(id.clone()))
    }

    fn set_aggregate(
        &self,
        id: &ProjectId,
        total_commits: u64,
        last_commit_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.modify_project(id, |p| {
            p.total_commits = total_commits;
            p.last_commit_at = last_commit_at;
        })?
        .map(|_| ())
        .ok_or_else(|| StoreError::ProjectNotFound(id.clone()))
    }

    fn get_commit(&self, sha: &Sha) -> Result<Option<Commit>> {
        Ok(self.read_commits()?.get(sha).cloned())
    }

    fn increment_vote(&self, sha: &Sha, kind: VoteKind) -> Result<Option<Votes>> {
        let mut commits = self.write_commits()?;
        let Some(commit) = commits.get_mut(sha) else {
            return Ok(None);
        };
        let mut updated = commit.clone();
        updated.votes.record(kind);
        write_atomic(&self.commit_path(sha), &to_json(&updated)?)?;
        *commit = updated;
        Ok(Some(commit.votes))
    }

    fn commits(&self, filter: &CommitFilter) -> Result<Vec<Commit>> {
        let mut commits: Vec<Commit> = self
            .read_commits()?
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        sort_newest_first(&mut commits);
        Ok(commits)
    }
}
