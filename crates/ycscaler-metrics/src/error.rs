//! Error types for metric queries and reduction.

use thiserror::Error;

use ycscaler_auth::AuthError;

/// The remote query failed before any data could be reduced.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("failed to execute request: {0}")]
    Transport(String),

    #[error("metric query timed out")]
    Timeout,

    #[error("API error: {status}, {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Decode(String),
}

impl QueryError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            QueryError::Timeout
        } else {
            QueryError::Transport(err.to_string())
        }
    }
}

/// The query succeeded but produced nothing to scale on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("all metric values are NaN")]
    AllNaN,

    #[error("no valid metric data available")]
    NoData,

    #[error("no values to aggregate")]
    EmptyInput,

    #[error("unknown aggregation method: {0}")]
    UnknownMethod(String),
}

/// Any failure of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to get IAM token: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Data(#[from] DataError),
}
