use std::fmt;
use thiserror::Error as ThisError;

use super::credential::PoolError;

/// Failures surfaced by an [`ApiTransport`](crate::api::ApiTransport) or
/// [`Pager`](crate::api::Pager) implementation.
#[derive(Debug, ThisError)]
pub enum TransportError {
    /// The upstream reported quota exhaustion and named a reset epoch.
    /// A recoverable signal: the dispatcher rotates credentials on it.
    #[error("rate limit exceeded; quota resets at {reset}")]
    RateLimited { reset: i64 },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("{0}")]
    Message(String),
}

/// Which bounded retry loop ran dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryKind {
    /// Credential rotations and quota waits within one call.
    Rotation,
    /// Re-polls of an endpoint answering 202 within one invoke.
    Accepted,
}

impl fmt::Display for RetryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryKind::Rotation => write!(f, "credential rotation"),
            RetryKind::Accepted => write!(f, "202 retry"),
        }
    }
}

/// Failures raised by the scope-aware dispatcher.
#[derive(Debug, ThisError)]
pub enum DispatchError {
    #[error("bad API path {0:?}: expected at least namespace/method")]
    BadApiPath(String),

    #[error("no credentials: install a token or attach a pool first")]
    NoCredentials,

    #[error("{kind} retries exhausted after {attempts} attempts")]
    RetryExhausted { kind: RetryKind, attempts: u32 },

    #[error("unexpected API response: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
