use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Per-request failures. Each variant maps to exactly one status code and
/// is rendered as `{"error": ..., "detail"?: ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// A required secret or setting is missing on the server.
    #[error("Server is not configured (missing {0}).")]
    Configuration(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    /// The upstream call never produced a response.
    #[error("upstream request failed")]
    Network(#[from] reqwest::Error),
}

impl ConsoleError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ConsoleError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ConsoleError::Validation(_) => StatusCode::BAD_REQUEST,
            ConsoleError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ConsoleError::Network(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ConsoleError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ConsoleError::Network(err) => json!({
                "error": self.to_string(),
                "detail": err.to_string(),
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
