//! Tracked projects and their derived aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::ProjectId;

/// A tracked project as persisted in the store.
///
/// `total_commits` and `last_commit_at` are aggregates maintained by the
/// ingestion pipeline; they are never written by the project API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub repository_url: String,

    /// Shared secret for webhook signature verification.
    ///
    /// `None` disables verification for this project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub total_commits: u64,
}

impl Project {
    /// Builds a fresh, active project with zeroed aggregates.
    pub fn new(new: NewProject, webhook_secret: Option<String>) -> Self {
        Project {
            id: ProjectId::generate(),
            name: new.name,
            description: new.description,
            repository_url: new.repository_url,
            webhook_secret,
            is_active: true,
            created_at: Utc::now(),
            last_commit_at: None,
            total_commits: 0,
        }
    }

    /// Applies one ingested commit to the aggregates.
    ///
    /// `last_commit_at` only moves forward.
    pub fn record_commit(&mut self, timestamp: DateTime<Utc>) {
        self.total_commits = self.total_commits.saturating_add(1);
        self.last_commit_at = Some(match self.last_commit_at {
            Some(current) => current.max(timestamp),
            None => timestamp,
        });
    }

    /// Applies a partial update from the project API.
    pub fn apply_update(&mut self, update: ProjectUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(repository_url) = update.repository_url {
            self.repository_url = repository_url;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
    }

    /// Read-side view with the secret removed.
    pub fn view(&self) -> ProjectView {
        ProjectView {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            repository_url: self.repository_url.clone(),
            is_active: self.is_active,
            created_at: self.created_at,
            last_commit_at: self.last_commit_at,
            total_commits: self.total_commits,
        }
    }
}

/// Fields supplied when creating a project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProject {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    pub repository_url: String,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProjectUpdate {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub repository_url: Option<String>,

    #[serde(default)]
    pub is_active: Option<bool>,
}

/// A project as returned by read APIs. Never carries the webhook secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectView {
    pub id: ProjectId,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub repository_url: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit_at: Option<DateTime<Utc>>,

    pub total_commits: u64,
}
