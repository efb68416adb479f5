use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

// Counter store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("operation failed: {0}")]
    Operation(String),
}

// Challenge verifier failures, all of them count as a failed verdict
#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("verifier request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("verifier is not configured")]
    NotConfigured,
}

// Errors surfaced to the client by the auxiliary endpoints and the proxy path
#[derive(Debug, Error)]
pub enum GatekeeperError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Missing {0}")]
    MissingParameter(&'static str),

    #[error("Bad Request")]
    BadRequest,

    #[error("CAPTCHA failed. Try again.")]
    ChallengeFailed,

    // The counter was not reset, the client stays blocked
    #[error("Unblock failed, try again later")]
    Store(#[from] StoreError),

    #[error("Payload Too Large")]
    PayloadTooLarge,

    #[error("Origin unreachable")]
    Origin(#[source] reqwest::Error),
}

impl GatekeeperError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::ChallengeFailed => StatusCode::FORBIDDEN,
            Self::MissingParameter(_) | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Origin(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

// Startup failures while building the shared state
#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid {0} url: {1}")]
    Url(&'static str, String),

    #[error("invalid identity header name: {0}")]
    Header(#[from] axum::http::header::InvalidHeaderName),

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

impl IntoResponse for GatekeeperError {
    fn into_response(self) -> Response {
        match &self {
            Self::Store(e) => tracing::error!(error = %e, "counter store failure"),
            Self::Origin(e) => tracing::error!(error = %e, "origin request failed"),
            _ => tracing::debug!(reason = %self, "request refused"),
        }
        (self.status(), self.to_string()).into_response()
    }
}
