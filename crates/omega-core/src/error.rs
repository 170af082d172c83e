//! Error types for the Omega gateway.

use thiserror::Error;

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// The three failure kinds the HTTP edge distinguishes: authentication (401),
/// request validation (400), and upstream/storage failures (500).
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl GatewayError {
    pub fn validation(msg: impl Into<String>) -> Self {
        GatewayError::Validation(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        GatewayError::Upstream(msg.into())
    }
}
