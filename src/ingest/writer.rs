//! Idempotent commit writer.

use tracing::debug;

use crate::store::{InsertOutcome, Store, StoreError};
use crate::types::Commit;

/// Persists one normalized commit.
///
/// Duplicates are reported as [`InsertOutcome::AlreadyExists`], not as
/// errors. The store's atomic insert-if-absent is the only uniqueness check;
/// this function never looks before it writes.
pub fn write_commit(store: &dyn Store, commit: Commit) -> Result<InsertOutcome, StoreError> {
    let sha = commit.sha.clone();
    let outcome = store.insert_commit_if_absent(commit)?;
    debug!(sha = %sha, ?outcome, "Commit write");
    Ok(outcome)
}
