use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds surfaced by the rank source, preview resolver and proxy layers.
///
/// Transport failures are converted into `Upstream` at the client boundary so
/// callers can match on kind instead of inspecting reqwest internals. Errors
/// are `Clone` because in-flight playlist builds are shared between callers.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Last.fm API key not configured")]
    ConfigurationMissing,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Rate limit exceeded. Please wait before making another request.")]
    RateLimited { retry_after_secs: u64 },

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Track not found")]
    NoMatchFound,

    #[error("No tracks found for this user and time period.")]
    EmptyPlaylist,
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Upstream(e.to_string())
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::ConfigurationMissing => StatusCode::BAD_REQUEST,
            Error::UserNotFound(_) => StatusCode::NOT_FOUND,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::NoMatchFound => StatusCode::NOT_FOUND,
            Error::EmptyPlaylist => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = match &self {
            Error::ConfigurationMissing => json!({
                "error": self.to_string(),
                "demo": true,
            }),
            Error::UserNotFound(_) => json!({
                "error": "User not found",
                "userNotFound": true,
            }),
            Error::RateLimited { retry_after_secs } => json!({
                "error": self.to_string(),
                "retryAfter": retry_after_secs,
            }),
            Error::Upstream(details) => json!({
                "error": "Upstream request failed",
                "details": details,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
