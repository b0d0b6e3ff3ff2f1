//! Shared test fixtures, a fault-injecting store, and proptest generators.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use serde_json::{Value, json};

use crate::store::{CommitFilter, InsertOutcome, MemoryStore, Store, StoreError};
use crate::types::{
    Author, ChangeKind, Commit, FileChange, NewProject, Project, ProjectId, ProjectUpdate, Sha,
    VoteKind, Votes,
};
use crate::webhooks::{compute_signature, format_signature_header};

pub fn sample_project(name: &str, secret: Option<&str>) -> Project {
    Project::new(
        NewProject {
            name: name.to_string(),
            description: None,
            repository_url: format!("https://github.com/octo/{name}"),
        },
        secret.map(str::to_string),
    )
}

pub fn sample_commit(sha: &str, project_id: &ProjectId, timestamp: DateTime<Utc>) -> Commit {
    Commit {
        sha: Sha::parse(sha).unwrap(),
        message: format!("commit {sha}"),
        author: Author {
            name: "Mona".to_string(),
            email: "mona@example.com".to_string(),
            username: None,
            avatar: None,
        },
        project_id: project_id.clone(),
        branch: "main".to_string(),
        timestamp,
        url: None,
        files_changed: vec![FileChange::new("README.md", ChangeKind::Modified)],
        stats: None,
        votes: Votes::default(),
        created_at: timestamp,
    }
}

/// One entry of a push payload's `commits` array.
pub fn commit_entry(id: &str, timestamp: &str) -> Value {
    json!({
        "id": id,
        "message": format!("commit {id}"),
        "author": {"name": "Mona", "email": "mona@example.com"},
        "timestamp": timestamp,
        "url": format!("https://github.com/octo/demo/commit/{id}"),
        "added": [],
        "removed": [],
        "modified": ["README.md"]
    })
}

pub fn push_body(git_ref: &str, commits: Vec<Value>) -> Value {
    json!({
        "ref": git_ref,
        "repository": {"name": "demo", "full_name": "octo/demo"},
        "commits": commits
    })
}

/// The `X-Hub-Signature-256` value a sender holding `secret` would attach.
pub fn signed_header(body: &[u8], secret: &str) -> String {
    format_signature_header(&compute_signature(body, secret.as_bytes()))
}

/// A [`MemoryStore`] that fails selected operations on demand.
pub struct FailingStore {
    inner: MemoryStore,
    fail_inserts: HashSet<String>,
    fail_aggregates: bool,
}

impl FailingStore {
    pub fn new(inner: MemoryStore) -> Self {
        FailingStore {
            inner,
            fail_inserts: HashSet::new(),
            fail_aggregates: false,
        }
    }

    pub fn fail_insert_of(mut self, sha: &str) -> Self {
        self.fail_inserts.insert(sha.to_string());
        self
    }

    pub fn fail_aggregates(mut self) -> Self {
        self.fail_aggregates = true;
        self
    }

    fn injected(what: &str) -> StoreError {
        StoreError::Io(std::io::Error::other(format!("injected {what} failure")))
    }
}

impl Store for FailingStore {
    fn get_project(&self, id: &ProjectId) -> crate::store::Result<Option<Project>> {
        self.inner.get_project(id)
    }

    fn list_projects(&self) -> crate::store::Result<Vec<Project>> {
        self.inner.list_projects()
    }

    fn create_project(&self, project: Project) -> crate::store::Result<Project> {
        self.inner.create_project(project)
    }

    fn update_project(
        &self,
        id: &ProjectId,
        update: ProjectUpdate,
    ) -> crate::store::Result<Option<Project>> {
        self.inner.update_project(id, update)
    }

    fn insert_commit_if_absent(&self, commit: Commit) -> crate::store::Result<InsertOutcome> {
        if self.fail_inserts.contains(commit.sha.as_str()) {
            return Err(Self::injected("insert"));
        }
        self.inner.insert_commit_if_absent(commit)
    }

    fn apply_aggregate(&self, id: &ProjectId, timestamp: DateTime<Utc>) -> crate::store::Result<()> {
        if self.fail_aggregates {
            return Err(Self::injected("aggregate"));
        }
        self.inner.apply_aggregate(id, timestamp)
    }

    fn set_aggregate(
        &self,
        id: &ProjectId,
        total_commits: u64,
        last_commit_at: Option<DateTime<Utc>>,
    ) -> crate::store::Result<()> {
        self.inner.set_aggregate(id, total_commits, last_commit_at)
    }

    fn get_commit(&self, sha: &Sha) -> crate::store::Result<Option<Commit>> {
        self.inner.get_commit(sha)
    }

    fn increment_vote(&self, sha: &Sha, kind: VoteKind) -> crate::store::Result<Option<Votes>> {
        self.inner.increment_vote(sha, kind)
    }

    fn commits(&self, filter: &CommitFilter) -> crate::store::Result<Vec<Commit>> {
        self.inner.commits(filter)
    }
}

pub fn arb_sha() -> impl Strategy<Value = Sha> {
    "[0-9a-f]{40}".prop_map(|s| Sha::parse(s).unwrap())
}

/// Timestamps within a few years of 2024, at second precision.
pub fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (1_640_995_200i64..1_767_225_600i64)
        .prop_map(|secs| DateTime::from_timestamp(secs, 0).unwrap())
}
