use thiserror::Error as ThisError;

use crate::credential::Scope;

/// Failures raised by credential constructors.
#[derive(Debug, ThisError)]
pub enum CredentialError {
    #[error("personal access token must not be empty")]
    EmptyToken,

    #[error("client id and client secret must not be empty")]
    EmptyClientSecret,
}

/// Failures raised by the credential factory.
#[derive(Debug, ThisError)]
pub enum FactoryError {
    #[error("bad credential descriptor: {0}")]
    BadDescriptor(String),

    #[error("credential construction failed: {0}")]
    Construction(#[from] CredentialError),
}

/// Failures raised by the file-backed credential pool.
#[derive(Debug, ThisError)]
pub enum PoolError {
    #[error("pool file {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("credential pool is empty")]
    Empty,

    #[error("reset {reset} is not in the future (now: {now})")]
    BadReset { reset: i64, now: i64 },

    #[error("no current credential for scope {scope}; call get_token first")]
    NoCurrent { scope: Scope },

    #[error("pool IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pool serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
