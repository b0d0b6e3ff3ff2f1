//! Project aggregate updater.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::store::{Store, StoreError};
use crate::types::ProjectId;

/// Records one newly inserted commit against its project's aggregates.
///
/// Must be called exactly once per [`InsertOutcome::Inserted`] and never for
/// duplicates, so `total_commits` tracks the number of distinct commits. A
/// failure here does not undo the insert; reconciliation repairs the drift.
///
/// [`InsertOutcome::Inserted`]: crate::store::InsertOutcome::Inserted
pub fn update_aggregate(
    store: &dyn Store,
    project_id: &ProjectId,
    timestamp: DateTime<Utc>,
) -> Result<(), StoreError> {
    store.apply_aggregate(project_id, timestamp)?;
    debug!(project_id = %project_id, %timestamp, "Aggregate updated");
    Ok(())
}
