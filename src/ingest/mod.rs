//! The webhook ingestion pipeline.
//!
//! - [`writer`] - idempotent commit insertion
//! - [`aggregate`] - per-project counters, applied once per new commit
//! - [`orchestrator`] - sequencing and the per-commit failure policy
//! - [`reconcile`] - out-of-band repair of aggregate drift

pub mod aggregate;
pub mod orchestrator;
pub mod outcome;
pub mod reconcile;
pub mod writer;

pub use aggregate::update_aggregate;
pub use orchestrator::{IngestError, WebhookDelivery, ingest_delivery, ingest_push};
pub use outcome::{CommitOutcome, EventDisposition, IngestReport, OutcomeCounts, SkipReason};
pub use reconcile::{Reconciliation, reconcile_all, reconcile_project};
pub use writer::write_commit;
