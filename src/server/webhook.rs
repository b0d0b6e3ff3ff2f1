//! Webhook endpoint handler.
//!
//! Accepts push notifications for one project, verifies the signature when
//! the project has a secret, and runs the ingestion pipeline before
//! responding. Per-commit failures are logged and never change the response.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use serde_json::{Value, json};
use tracing::debug;

use super::{ApiError, AppState, parse_project_id};
use crate::ingest::{WebhookDelivery, ingest_delivery};
use crate::webhooks::EventKind;

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub delivery ID.
const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for GitHub signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

/// Webhook handler.
///
/// # Request
///
/// - Method: POST `/webhook/{project_id}`
/// - Headers:
///   - `X-GitHub-Event`: only `push` is processed; anything else is acknowledged
///   - `X-Hub-Signature-256`: optional `sha256=<hex>` HMAC of the raw body
///   - `X-GitHub-Delivery`: optional, used for log correlation only
/// - Body: JSON push payload
///
/// # Response
///
/// - 200 OK `{"message": "Webhook processed successfully"}`
/// - 401 Unauthorized: signature present, secret configured, and no match
/// - 404 Not Found: unknown project
/// - 500 Internal Server Error: the project lookup failed
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    Path(raw_project_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let project_id = parse_project_id(&raw_project_id)?;
    let event_kind = EventKind::from_header(get_header(&headers, HEADER_EVENT).as_deref());
    let signature = get_header(&headers, HEADER_SIGNATURE);
    let delivery_id = get_header(&headers, HEADER_DELIVERY);

    debug!(
        project_id = %project_id,
        delivery_id = delivery_id.as_deref().unwrap_or("-"),
        bytes = body.len(),
        "Received webhook"
    );

    app_state
        .with_store(move |store| {
            let delivery = WebhookDelivery {
                project_id: &project_id,
                event_kind,
                signature: signature.as_deref(),
                delivery_id: delivery_id.as_deref(),
                body: &body,
            };
            ingest_delivery(store, &delivery).map_err(ApiError::from)
        })
        .await?;

    Ok(Json(json!({ "message": "Webhook processed successfully" })))
}

/// Reads an optional header as UTF-8. Non-UTF-8 values count as absent.
fn get_header(headers: &HeaderMap, name: &'static str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
