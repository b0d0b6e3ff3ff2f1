//! Ingestion orchestrator.
//!
//! Drives one webhook delivery through the pipeline:
//!
//! ```text
//! RECEIVED -> PROJECT_RESOLVED -> SIGNATURE_CHECKED -> EVENT_PARSED
//!          -> per commit: NORMALIZED -> WRITTEN -> AGGREGATED
//!          -> COMPLETED
//! ```
//!
//! Only an unknown project or a rejected signature aborts the request (plus a
//! storage failure while resolving the project, which leaves nothing to
//! process). Everything after that is best effort per commit: a failing entry
//! is logged and skipped, and the request still completes.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use super::aggregate::update_aggregate;
use super::outcome::{CommitOutcome, EventDisposition, IngestReport, SkipReason};
use super::writer::write_commit;
use crate::store::{InsertOutcome, Store, StoreError};
use crate::types::ProjectId;
use crate::webhooks::{
    EventKind, PushEvent, SignatureCheck, check_signature, normalize_push, parse_push_event,
};

/// Request-level failures. Per-commit failures never surface here.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("invalid signature")]
    InvalidSignature,

    /// The project could not be looked up.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// One inbound webhook request, as received.
#[derive(Debug, Clone)]
pub struct WebhookDelivery<'a> {
    /// Project id from the request path.
    pub project_id: &'a ProjectId,

    pub event_kind: EventKind,

    /// Raw `X-Hub-Signature-256` value, if sent.
    pub signature: Option<&'a str>,

    /// Raw `X-GitHub-Delivery` value, if sent. Logged only.
    pub delivery_id: Option<&'a str>,

    /// Exact request body bytes.
    pub body: &'a [u8],
}

/// Runs a delivery through the whole pipeline.
pub fn ingest_delivery(
    store: &dyn Store,
    delivery: &WebhookDelivery<'_>,
) -> Result<IngestReport, IngestError> {
    let project_id = delivery.project_id;
    let _span = info_span!(
        "ingest",
        project_id = %project_id,
        delivery_id = delivery.delivery_id.unwrap_or("-")
    )
    .entered();

    // PROJECT_RESOLVED
    let project = store
        .get_project(project_id)?
        .ok_or_else(|| IngestError::ProjectNotFound(project_id.clone()))?;
    if !project.is_active {
        debug!("Delivery for inactive project");
    }

    // SIGNATURE_CHECKED
    match check_signature(
        delivery.body,
        delivery.signature,
        project.webhook_secret.as_deref(),
    ) {
        SignatureCheck::Verified => debug!("Signature verified"),
        SignatureCheck::Skipped => debug!(
            has_secret = project.webhook_secret.is_some(),
            has_signature = delivery.signature.is_some(),
            "Signature check skipped"
        ),
        SignatureCheck::Rejected => {
            warn!("Invalid webhook signature");
            return Err(IngestError::InvalidSignature);
        }
    }

    // EVENT_PARSED
    let event = match &delivery.event_kind {
        EventKind::Push => match parse_push_event(delivery.body) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed push payload");
                return Ok(IngestReport::new(
                    project_id.clone(),
                    EventDisposition::InvalidPayload(e.to_string()),
                ));
            }
        },
        EventKind::Other(kind) => {
            debug!(event_kind = %kind, "Ignoring non-push event");
            return Ok(IngestReport::new(
                project_id.clone(),
                EventDisposition::IgnoredEvent(Some(kind.clone())),
            ));
        }
        EventKind::Missing => {
            debug!("Ignoring delivery without event kind");
            return Ok(IngestReport::new(
                project_id.clone(),
                EventDisposition::IgnoredEvent(None),
            ));
        }
    };

    let mut report = IngestReport::new(project_id.clone(), EventDisposition::Processed);
    report.outcomes = ingest_push(store, project_id, &event, Utc::now());

    let counts = report.counts();
    info!(
        repository = event.repository.display_name(),
        branch = event.branch(),
        received = report.outcomes.len(),
        inserted = counts.inserted,
        already_exists = counts.already_exists,
        skipped = counts.skipped,
        aggregate_failed = counts.aggregate_failed,
        "Push processed"
    );
    Ok(report)
}

/// Processes every commit of a push event in provider order.
///
/// Returns one outcome per entry. Never fails as a whole.
pub fn ingest_push(
    store: &dyn Store,
    project_id: &ProjectId,
    event: &PushEvent,
    received_at: DateTime<Utc>,
) -> Vec<CommitOutcome> {
    normalize_push(event, project_id, received_at)
        .into_iter()
        .enumerate()
        .map(|(index, normalized)| {
            // NORMALIZED
            let commit = match normalized {
                Ok(commit) => commit,
                Err(e) => {
                    warn!(index, error = %e, "Skipping commit entry");
                    return CommitOutcome::Skipped {
                        index,
                        sha: e.sha().cloned(),
                        reason: SkipReason::Normalize(e.to_string()),
                    };
                }
            };
            let sha = commit.sha.clone();
            let timestamp = commit.timestamp;

            // WRITTEN
            match write_commit(store, commit) {
                Ok(InsertOutcome::Inserted) => {}
                Ok(InsertOutcome::AlreadyExists) => return CommitOutcome::AlreadyExists(sha),
                Err(e) => {
                    warn!(index, sha = %sha, error = %e, "Failed to store commit");
                    return CommitOutcome::Skipped {
                        index,
                        sha: Some(sha),
                        reason: SkipReason::Storage(e.to_string()),
                    };
                }
            }

            // AGGREGATED
            match update_aggregate(store, project_id, timestamp) {
                Ok(()) => CommitOutcome::Inserted(sha),
                Err(e) => {
                    warn!(
                        sha = %sha,
                        error = %e,
                        "Commit stored but aggregate update failed; reconcile to repair"
                    );
                    CommitOutcome::AggregateFailed {
                        sha,
                        error: e.to_string(),
                    }
                }
            }
        })
        .collect()
}
