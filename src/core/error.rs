//! Error types for queue requests.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced at the queue boundary. Engine operations themselves are infallible.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Nothing to dequeue.
    #[error("queue empty")]
    Empty,
    /// Request payload failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Duration string could not be parsed.
    #[error("invalid duration: {0}")]
    InvalidDuration(String),
    /// Queue could not be built from configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl QueueError {
    /// HTTP-style status code a transport should report for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Empty => 404,
            Self::InvalidRequest(_) | Self::InvalidDuration(_) => 400,
            Self::Config(_) => 500,
        }
    }

    /// Whether the caller sent something malformed.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_) | Self::InvalidDuration(_))
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
