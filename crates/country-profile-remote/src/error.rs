//! Error types for remote lookups.

use thiserror::Error;

/// Failure of a single remote call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::MalformedResponse(e.to_string())
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Errors raised while building a client from configuration.
#[derive(Error, Debug)]
pub enum RemoteConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}
