//! Webhook receiver for provider push notifications.
//!
//! Google posts notification headers with an empty body and expects a fast
//! 2xx; the actual pull runs on a detached task so slow provider calls
//! never stall the acknowledgement.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use clinsync_common::retry::RetryPolicy;
use clinsync_common::telemetry::init_tracing;
use clinsync_core::sync::SyncOrchestrator;
use clinsync_domain::{Result, SyncError};
use tracing::{debug, error, info};

const CHANNEL_ID_HEADER: &str = "x-goog-channel-id";
const RESOURCE_ID_HEADER: &str = "x-goog-resource-id";
const RESOURCE_STATE_HEADER: &str = "x-goog-resource-state";

/// Build the webhook router over the shared orchestrator.
pub fn webhook_router(orchestrator: Arc<SyncOrchestrator>) -> Router {
    Router::new()
        .route("/webhooks/calendar", post(handle_calendar_notification))
        .route("/health", get(|| async { StatusCode::OK }))
        .with_state(orchestrator)
}

/// Bind and serve the webhook router until the process exits.
pub async fn serve(bind_addr: &str, orchestrator: Arc<SyncOrchestrator>) -> Result<()> {
    init_tracing();

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| SyncError::Config(format!("failed to bind {bind_addr}: {e}")))?;

    info!(bind_addr, "webhook server listening");
    axum::serve(listener, webhook_router(orchestrator))
        .await
        .map_err(|e| SyncError::Internal(format!("webhook server failed: {e}")))
}

/// Notification identifiers carried in the Google push headers.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Notification {
    channel_id: String,
    resource_id: String,
    resource_state: String,
}

fn extract_notification(headers: &HeaderMap) -> Option<Notification> {
    let header = |name: &str| {
        headers.get(name).and_then(|v| v.to_str().ok()).map(ToString::to_string)
    };
    Some(Notification {
        channel_id: header(CHANNEL_ID_HEADER)?,
        resource_id: header(RESOURCE_ID_HEADER)?,
        resource_state: header(RESOURCE_STATE_HEADER)?,
    })
}

async fn handle_calendar_notification(
    State(orchestrator): State<Arc<SyncOrchestrator>>,
    headers: HeaderMap,
) -> StatusCode {
    let Some(notification) = extract_notification(&headers) else {
        debug!("notification missing required headers");
        return StatusCode::BAD_REQUEST;
    };

    // Acknowledge immediately; the pull is idempotent and retried by the
    // provider's at-least-once delivery if the process dies mid-way.
    // Transient provider failures are retried with backoff before giving up.
    tokio::spawn(async move {
        let result = RetryPolicy::default()
            .run(
                || {
                    let orchestrator = orchestrator.clone();
                    let n = notification.clone();
                    async move {
                        orchestrator
                            .handle_webhook(&n.channel_id, &n.resource_id, &n.resource_state)
                            .await
                    }
                },
                SyncError::is_retryable,
            )
            .await;

        match result {
            Ok(Some(outcome)) => {
                debug!(
                    channel_id = %notification.channel_id,
                    imported = outcome.imported,
                    pruned = outcome.pruned,
                    "webhook pull completed"
                );
            }
            Ok(None) => {}
            Err(err) => {
                error!(channel_id = %notification.channel_id, error = %err, "webhook pull failed");
            }
        }
    });

    StatusCode::OK
}
