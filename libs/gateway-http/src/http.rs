use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::Instrument;

use gateway_api::{EnrichedRecord, IncomingPayload, SubmitAccepted};

use super::{AppState, SubmitError};

// ═══════════════════════════════════════════════════════════════
//  POST /v1/submit
// ═══════════════════════════════════════════════════════════════

/// decode → enrich → encode → append → 202.
///
/// The body is read raw and decoded here rather than through `Json<T>` so
/// that every structural failure (bad syntax, wrong top-level type, missing
/// content type) is a plain 400.
pub(crate) async fn handle_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let incoming = match IncomingPayload::from_json(&body) {
        Ok(p) => p,
        Err(e) => return SubmitError::InvalidPayload(e).into_response(),
    };

    let trace_id = state.settings.propagated_trace_id(&headers);
    let record = EnrichedRecord::enrich(incoming, trace_id);
    let span = tracing::info_span!(
        "submit",
        request_id = %record.request_id,
        trace_id = %record.trace_id,
    );

    async move {
        tracing::info!(agent_id = %record.agent_id, "received submission");
        match publish(&state, &record).await {
            Ok(()) => {
                tracing::info!(queue = %state.settings.queue_name, "published envelope");
                let accepted = SubmitAccepted {
                    request_id: record.request_id,
                };
                (StatusCode::ACCEPTED, Json(accepted)).into_response()
            }
            Err(e) => e.into_response(),
        }
    }
    .instrument(span)
    .await
}

async fn publish(state: &AppState, record: &EnrichedRecord) -> Result<(), SubmitError> {
    let envelope = state.codec.encode(record).map_err(SubmitError::Encode)?;

    let timeout = state.settings.append_timeout;
    match tokio::time::timeout(timeout, state.queue.push(&state.settings.queue_name, envelope)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(SubmitError::Append(e)),
        Err(_) => Err(SubmitError::AppendTimeout(timeout)),
    }
}

pub(crate) async fn handle_method_not_allowed(method: Method) -> Response {
    SubmitError::MethodNotAllowed(method).into_response()
}

// ═══════════════════════════════════════════════════════════════
//  GET /health, GET /ready
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_health() -> &'static str {
    "OK"
}

pub(crate) async fn handle_ready(State(state): State<AppState>) -> Response {
    let timeout = state.settings.append_timeout;
    let result = match tokio::time::timeout(timeout, state.queue.ping()).await {
        Ok(r) => r,
        Err(_) => Err(gateway_api::GatewayError::timeout(format!("ping exceeded {timeout:?}"))),
    };

    match result {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(e) => {
            tracing::warn!(queue = %state.queue.describe(), error = ?e, "queue not ready");
            (StatusCode::SERVICE_UNAVAILABLE, "queue unavailable").into_response()
        }
    }
}
