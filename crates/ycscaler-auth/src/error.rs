//! Error types for credential handling.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the service account key.
///
/// These are fatal at startup: without a usable key no token can ever be
/// obtained.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read key file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse key file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid RSA private key: {0}")]
    InvalidKey(String),
}

/// Errors raised while obtaining a bearer token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to sign assertion: {0}")]
    Sign(String),

    #[error("token exchange request failed: {0}")]
    Transport(String),

    #[error("token exchange timed out")]
    Timeout,

    #[error("IAM API error: {status}, {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode IAM response: {0}")]
    Decode(String),
}

impl AuthError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthError::Timeout
        } else {
            AuthError::Transport(err.to_string())
        }
    }
}
