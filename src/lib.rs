//! Commit Feed - ingests push webhooks from a git host and serves a feed of
//! commit activity per project.
//!
//! Deliveries are at-least-once, so ingestion is idempotent on the revision
//! hash and project aggregates only count commits that were newly stored.

pub mod config;
pub mod ingest;
pub mod query;
pub mod server;
pub mod store;
pub mod types;
pub mod webhooks;

#[cfg(test)]
mod test_utils;
