//! Conversion of push payload entries into canonical commit records.
//!
//! Each provider entry is normalized on its own; a failure is reported for
//! that entry and does not affect its neighbours. Output order matches the
//! provider's order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use super::push::{PushEvent, RawPushCommit};
use crate::types::{Author, ChangeKind, Commit, FileChange, InvalidSha, ProjectId, Sha, Votes};

/// Why a single push entry could not be turned into a commit record.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Entry is missing required fields or has the wrong shape.
    #[error("commit entry {index} is malformed: {source}")]
    Malformed {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("commit entry {index} has an unusable id: {source}")]
    InvalidSha {
        index: usize,
        #[source]
        source: InvalidSha,
    },

    #[error("commit {sha} has an unparseable timestamp {value:?}: {source}")]
    InvalidTimestamp {
        sha: Sha,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl NormalizeError {
    /// The revision hash, when the entry got far enough to have one.
    pub fn sha(&self) -> Option<&Sha> {
        match self {
            NormalizeError::InvalidTimestamp { sha, .. } => Some(sha),
            _ => None,
        }
    }
}

/// Builds the avatar URL for a provider username.
pub fn avatar_url(username: &str) -> String {
    format!("https://github.com/{username}.png?size=40")
}

/// Merges the provider's three filename lists into one change list.
///
/// Each filename appears once, in order of first appearance across
/// `added`, `removed`, `modified`. When a filename is in more than one list
/// the kind is chosen by [`ChangeKind::precedence`].
pub fn merge_file_changes(
    added: &[String],
    removed: &[String],
    modified: &[String],
) -> Vec<FileChange> {
    let mut order: Vec<&str> = Vec::new();
    let mut kinds: HashMap<&str, ChangeKind> = HashMap::new();

    let lists = [
        (added, ChangeKind::Added),
        (removed, ChangeKind::Removed),
        (modified, ChangeKind::Modified),
    ];
    for (names, kind) in lists {
        for name in names {
            kinds
                .entry(name.as_str())
                .and_modify(|existing| *existing = existing.precedence(kind))
                .or_insert_with(|| {
                    order.push(name.as_str());
                    kind
                });
        }
    }

    order
        .into_iter()
        .map(|name| FileChange::new(name, kinds[name]))
        .collect()
}

/// Normalizes one provider entry.
///
/// `index` is the entry's position in the payload, used in error reports.
pub fn normalize_commit(
    index: usize,
    entry: &serde_json::Value,
    project_id: &ProjectId,
    branch: &str,
    received_at: DateTime<Utc>,
) -> Result<Commit, NormalizeError> {
    let raw = RawPushCommit::deserialize(entry)
        .map_err(|source| NormalizeError::Malformed { index, source })?;

    let sha = Sha::parse(raw.id).map_err(|source| NormalizeError::InvalidSha { index, source })?;

    let timestamp = DateTime::parse_from_rfc3339(&raw.timestamp)
        .map_err(|source| NormalizeError::InvalidTimestamp {
            sha: sha.clone(),
            value: raw.timestamp.clone(),
            source,
        })?
        .with_timezone(&Utc);

    let avatar = raw
        .author
        .username
        .as_deref()
        .filter(|u| !u.is_empty())
        .map(avatar_url);

    Ok(Commit {
        files_changed: merge_file_changes(&raw.added, &raw.removed, &raw.modified),
        sha,
        message: raw.message,
        author: Author {
            name: raw.author.name,
            email: raw.author.email,
            username: raw.author.username,
            avatar,
        },
        project_id: project_id.clone(),
        branch: branch.to_string(),
        timestamp,
        url: raw.url,
        stats: None,
        votes: Votes::default(),
        created_at: received_at,
    })
}

/// Normalizes every entry of a push event, preserving provider order.
pub fn normalize_push(
    event: &PushEvent,
    project_id: &ProjectId,
    received_at: DateTime<Utc>,
) -> Vec<Result<Commit, NormalizeError>> {
    let branch = event.branch();
    event
        .commits
        .iter()
        .enumerate()
        .map(|(index, entry)| normalize_commit(index, entry, project_id, branch, received_at))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{commit_entry, push_body};
    use crate::webhooks::parse_push_event;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use serde_json::json;

    fn project() -> ProjectId {
        ProjectId::parse("p1").unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn merge_assigns_kinds_from_lists() {
        let changes = merge_file_changes(&names(&["a"]), &names(&["b"]), &names(&["c"]));
        assert_eq!(
            changes,
            vec![
                FileChange::new("a", ChangeKind::Added),
                FileChange::new("b", ChangeKind::Removed),
                FileChange::new("c", ChangeKind::Modified),
            ]
        );
    }

    #[test]
    fn modified_beats_removed() {
        let changes = merge_file_changes(&[], &names(&["x"]), &names(&["x"]));
        assert_eq!(changes, vec![FileChange::new("x", ChangeKind::Modified)]);
    }

    #[test]
    fn removed_beats_added_and_keeps_first_position() {
        let changes = merge_file_changes(&names(&["x", "y"]), &names(&["x"]), &[]);
        assert_eq!(
            changes,
            vec![
                FileChange::new("x", ChangeKind::Removed),
                FileChange::new("y", ChangeKind::Added),
            ]
        );
    }

    #[test]
    fn duplicate_names_within_a_list_collapse() {
        let changes = merge_file_changes(&names(&["x", "x"]), &[], &[]);
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn normalizes_full_entry() {
        let entry = json!({
            "id": "abc123",
            "message": "fix bug",
            "author": {"name": "A", "email": "a@x.com", "username": "octocat"},
            "timestamp": "2024-01-01T02:00:00+02:00",
            "url": "https://example.com/c/abc123",
            "added": ["f.txt"],
            "removed": [],
            "modified": []
        });
        let received = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let commit = normalize_commit(0, &entry, &project(), "main", received).unwrap();

        assert_eq!(commit.sha.as_str(), "abc123");
        assert_eq!(commit.branch, "main");
        assert_eq!(
            commit.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            commit.author.avatar.as_deref(),
            Some("https://github.com/octocat.png?size=40")
        );
        assert_eq!(commit.url.as_deref(), Some("https://example.com/c/abc123"));
        assert_eq!(commit.files_changed, vec![FileChange::new("f.txt", ChangeKind::Added)]);
        assert_eq!(commit.votes, Votes { up: 0, down: 0 });
        assert_eq!(commit.created_at, received);
    }

    #[test]
    fn no_username_means_no_avatar() {
        let entry = commit_entry("abc", "2024-01-01T00:00:00Z");
        let commit = normalize_commit(0, &entry, &project(), "main", Utc::now()).unwrap();
        assert_eq!(commit.author.username, None);
        assert_eq!(commit.author.avatar, None);
    }

    #[test]
    fn bad_timestamp_reports_sha() {
        let entry = commit_entry("abc", "yesterday");
        let err = normalize_commit(0, &entry, &project(), "main", Utc::now()).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidTimestamp { .. }));
        assert_eq!(err.sha().map(Sha::as_str), Some("abc"));
    }

    #[test]
    fn missing_fields_are_malformed() {
        let entry = json!({"id": "abc", "timestamp": "2024-01-01T00:00:00Z"});
        let err = normalize_commit(3, &entry, &project(), "main", Utc::now()).unwrap_err();
        assert!(matches!(err, NormalizeError::Malformed { index: 3, .. }));
        assert!(err.sha().is_none());
    }

    #[test]
    fn unsafe_id_is_rejected() {
        let entry = commit_entry("../../etc", "2024-01-01T00:00:00Z");
        let err = normalize_commit(0, &entry, &project(), "main", Utc::now()).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidSha { .. }));
    }

    #[test]
    fn push_preserves_order_and_isolates_failures() {
        let body = push_body(
            "refs/heads/dev",
            vec![
                commit_entry("c1", "2024-01-01T00:00:00Z"),
                commit_entry("c2", "not-a-time"),
                commit_entry("c3", "2024-01-03T00:00:00Z"),
            ],
        );
        let event = parse_push_event(&serde_json::to_vec(&body).unwrap()).unwrap();
        let results = normalize_push(&event, &project(), Utc::now());

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().sha.as_str(), "c1");
        assert!(results[1].is_err());
        let third = results[2].as_ref().unwrap();
        assert_eq!(third.sha.as_str(), "c3");
        assert_eq!(third.branch, "dev");
    }

    proptest! {
        /// Every input filename appears exactly once in the output.
        #[test]
        fn merge_covers_each_name_once(
            added in prop::collection::vec("[a-e]", 0..6),
            removed in prop::collection::vec("[a-e]", 0..6),
            modified in prop::collection::vec("[a-e]", 0..6),
        ) {
            let changes = merge_file_changes(&added, &removed, &modified);
            let mut expected: Vec<&String> =
                added.iter().chain(&removed).chain(&modified).collect();
            expected.sort();
            expected.dedup();
            prop_assert_eq!(changes.len(), expected.len());

            for change in &changes {
                let want = if modified.contains(&change.filename) {
                    ChangeKind::Modified
                } else if removed.contains(&change.filename) {
                    ChangeKind::Removed
                } else {
                    ChangeKind::Added
                };
                prop_assert_eq!(change.kind, want);
            }
        }
    }
}
