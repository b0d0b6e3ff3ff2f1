//! Summary statistics over a selection of commits.
//!
//! Computed from the commit records themselves, never from project
//! aggregates, so these stay correct even while aggregates have drifted.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::Commit;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Activity summary across projects, or for one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitStats {
    pub total_commits: u64,
    pub first_commit: Option<DateTime<Utc>>,
    pub last_commit: Option<DateTime<Utc>>,

    /// Sums over commits that carry line stats.
    pub total_additions: u64,
    pub total_deletions: u64,

    /// Distinct author emails.
    pub unique_authors_count: usize,

    /// Fractional days between the first and last commit.
    pub days_since_first: f64,

    /// Zero when all commits share one timestamp.
    pub commits_per_day: f64,
}

/// Per-project summary, including votes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectStats {
    pub total_commits: u64,
    pub first_commit: Option<DateTime<Utc>>,
    pub last_commit: Option<DateTime<Utc>>,
    pub unique_authors_count: usize,
    pub total_votes_up: u64,
    pub total_votes_down: u64,
    pub days_since_first: f64,
}

struct Span {
    first: Option<DateTime<Utc>>,
    last: Option<DateTime<Utc>>,
}

impl Span {
    fn of(commits: &[Commit]) -> Self {
        Span {
            first: commits.iter().map(|c| c.timestamp).min(),
            last: commits.iter().map(|c| c.timestamp).max(),
        }
    }

    fn days(&self) -> f64 {
        match (self.first, self.last) {
            (Some(first), Some(last)) => (last - first).num_milliseconds() as f64 / MILLIS_PER_DAY,
            _ => 0.0,
        }
    }
}

fn unique_authors(commits: &[Commit]) -> usize {
    commits
        .iter()
        .map(|c| c.author.email.as_str())
        .collect::<HashSet<_>>()
        .len()
}

pub fn commit_stats(commits: &[Commit]) -> CommitStats {
    let span = Span::of(commits);
    let days = span.days();
    let total_commits = commits.len() as u64;
    let (total_additions, total_deletions) = commits
        .iter()
        .filter_map(|c| c.stats)
        .fold((0u64, 0u64), |(adds, dels), s| {
            (adds.saturating_add(s.additions), dels.saturating_add(s.deletions))
        });

    CommitStats {
        total_commits,
        first_commit: span.first,
        last_commit: span.last,
        total_additions,
        total_deletions,
        unique_authors_count: unique_authors(commits),
        days_since_first: days,
        commits_per_day: if days > 0.0 {
            total_commits as f64 / days
        } else {
            0.0
        },
    }
}

pub fn project_stats(commits: &[Commit]) -> ProjectStats {
    let span = Span::of(commits);
    let (total_votes_up, total_votes_down) =
        commits.iter().fold((0u64, 0u64), |(up, down), c| {
            (up.saturating_add(c.votes.up), down.saturating_add(c.votes.down))
        });

    ProjectStats {
        total_commits: commits.len() as u64,
        first_commit: span.first,
        last_commit: span.last,
        unique_authors_count: unique_authors(commits),
        total_votes_up,
        total_votes_down,
        days_since_first: span.days(),
    }
}
