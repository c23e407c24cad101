use std::time::Duration;

use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};

use gateway_api::GatewayError;

/// Why a submission was refused. Each variant maps to one HTTP status and a
/// short plain-text body; the detail only goes to the log.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("encode envelope: {0}")]
    Encode(GatewayError),

    #[error("append to queue: {0}")]
    Append(GatewayError),

    #[error("append to queue exceeded {0:?}")]
    AppendTimeout(Duration),
}

impl SubmitError {
    pub fn status(&self) -> StatusCode {
        match self {
            SubmitError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            SubmitError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            SubmitError::Encode(_) | SubmitError::Append(_) | SubmitError::AppendTimeout(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> &'static str {
        match self {
            SubmitError::MethodNotAllowed(_) => "Only POST method is allowed",
            SubmitError::InvalidPayload(_) => "Invalid JSON payload",
            _ => "Internal server error",
        }
    }
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            let kind = match &self {
                SubmitError::Encode(e) | SubmitError::Append(e) => Some(e.kind()),
                _ => None,
            };
            tracing::error!(error = %self, kind = ?kind, "submission failed");
        } else {
            tracing::warn!(error = %self, "submission rejected");
        }

        let body = self.body();
        if matches!(self, SubmitError::MethodNotAllowed(_)) {
            (status, [(header::ALLOW, "POST")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
