mod error;
mod http;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use gateway_api::{EnvelopeCodec, EnvelopeQueue};

pub use axum::http::HeaderName;
pub use error::SubmitError;

/// Submission endpoint path.
pub const SUBMIT_PATH: &str = "/v1/submit";

/// Propagated trace ids longer than this are ignored and a fresh id is drawn.
const MAX_TRACE_ID_LEN: usize = 256;

/// Per-process handler settings. Immutable after startup.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Queue every envelope is appended to.
    pub queue_name: String,
    /// Upper bound on one queue append.
    pub append_timeout: Duration,
    /// Request header carrying an upstream trace id. `None` = always
    /// generate locally.
    pub trace_header: Option<HeaderName>,
}

impl GatewaySettings {
    pub fn new(queue_name: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
            append_timeout: Duration::from_secs(5),
            trace_header: None,
        }
    }

    pub fn with_append_timeout(mut self, timeout: Duration) -> Self {
        self.append_timeout = timeout;
        self
    }

    pub fn with_trace_header(mut self, header: HeaderName) -> Self {
        self.trace_header = Some(header);
        self
    }

    fn propagated_trace_id(&self, headers: &HeaderMap) -> Option<String> {
        let name = self.trace_header.as_ref()?;
        let value = headers.get(name)?.to_str().ok()?.trim();
        if value.is_empty() || value.len() > MAX_TRACE_ID_LEN {
            return None;
        }
        Some(value.to_string())
    }
}

#[derive(Clone)]
struct AppState {
    queue: Arc<dyn EnvelopeQueue>,
    codec: Arc<dyn EnvelopeCodec>,
    settings: Arc<GatewaySettings>,
}

/// Build the gateway router around an already-connected queue.
///
/// Routes:
/// - `POST /v1/submit` (any other method → 405)
/// - `GET /health` liveness
/// - `GET /ready` queue reachability
///
/// Request bodies are not size-limited: a submission is either accepted or
/// rejected for its structure, never for its length.
pub fn router(
    queue: Arc<dyn EnvelopeQueue>,
    codec: Arc<dyn EnvelopeCodec>,
    settings: GatewaySettings,
) -> Router {
    let state = AppState {
        queue,
        codec,
        settings: Arc::new(settings),
    };

    Router::new()
        .route(
            SUBMIT_PATH,
            post(http::handle_submit).fallback(http::handle_method_not_allowed),
        )
        .route("/health", get(http::handle_health))
        .route("/ready", get(http::handle_ready))
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

/// Serve `app` on an already-bound listener until `shutdown` fires, then
/// drain in-flight requests.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}
