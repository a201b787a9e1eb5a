//! axum router and the per-delivery handler.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reconciler::Reconciler;
use serde_json::json;
use tracing::{debug, field, info, info_span, warn, Instrument};
use twin::{Delivery, InvocationId, ReconcilerConfig, RegistryConnector, Status};

use crate::error::WebhookError;
use crate::signature::{SignatureVerifier, SIGNATURE_HEADER};

/// Shared state for every request.
pub struct AppState<C> {
    connector: Arc<C>,
    verifier: Arc<SignatureVerifier>,
    config: Arc<ReconcilerConfig>,
}

impl<C> AppState<C> {
    pub fn new(connector: C, verifier: SignatureVerifier, config: ReconcilerConfig) -> Self {
        Self {
            connector: Arc::new(connector),
            verifier: Arc::new(verifier),
            config: Arc::new(config),
        }
    }
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            verifier: Arc::clone(&self.verifier),
            config: Arc::clone(&self.config),
        }
    }
}

/// Builds the webhook router: `POST /` for deliveries, `GET /healthz`.
pub fn build_router<C>(state: AppState<C>) -> Router
where
    C: RegistryConnector + 'static,
{
    Router::new()
        .route("/", post(receive::<C>))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn receive<C>(State(state): State<AppState<C>>, headers: HeaderMap, body: Bytes) -> Response
where
    C: RegistryConnector + 'static,
{
    let invocation = InvocationId::new_random();
    let span = info_span!(
        "invocation",
        invocation_id = %invocation,
        event_type = field::Empty,
        target = field::Empty
    );
    let started = Instant::now();

    let status = match handle(&state, &headers, &body).instrument(span.clone()).await {
        Ok(status) => status,
        Err(err) => {
            span.in_scope(|| warn!(error = %err, "delivery rejected"));
            err.to_status()
        }
    };

    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    span.in_scope(|| {
        info!(
            status = status.code,
            message = %status.message,
            elapsed_ms,
            "invocation finished"
        )
    });

    respond(status)
}

async fn handle<C>(
    state: &AppState<C>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Status, WebhookError>
where
    C: RegistryConnector + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    state.verifier.verify(signature, body)?;

    let delivery: Delivery = serde_json::from_slice(body).map_err(WebhookError::InvalidPayload)?;
    let span = tracing::Span::current();
    span.record("event_type", delivery.event.event_type());
    span.record("target", delivery.event.target_name.as_str());

    let registry = state
        .connector
        .connect()
        .await
        .map_err(|err| WebhookError::NotAuthenticated(err.to_string()))?;

    let reconciliation = Reconciler::new(&registry, &state.config)
        .reconcile(&delivery.event, &delivery.labels)
        .await;

    debug!(
        steps = reconciliation.steps.len(),
        best_effort_failures = reconciliation.best_effort_failures().count(),
        twin = ?reconciliation.twin,
        "reconciliation complete"
    );
    Ok(reconciliation.status)
}

fn respond(status: Status) -> Response {
    let code = StatusCode::from_u16(status.code).unwrap_or(StatusCode::BAD_GATEWAY);
    (code, status.message).into_response()
}
