//! Account Sync Errors

use std::time::Duration;
use thiserror::Error;

/// The request never produced an HTTP response
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("request timed out after {0:?}")]
    TimedOut(Duration),
}

/// Failure of a single account API call
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Body that is not the expected JSON envelope
    #[error("unexpected response (HTTP {status}): {body}")]
    Unparseable { status: u16, body: String },

    /// Errors reported by the API in the `errors` array
    #[error("{}", .0.join("\n"))]
    Api(Vec<String>),

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("response has no results")]
    MissingResult,
}
