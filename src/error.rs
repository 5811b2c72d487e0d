use http::StatusCode;
use thiserror::Error;

use crate::cache::CacheError;

/// Errors surfaced by the client, the injection helper and the service calls.
///
/// Nothing here is retried; every variant reaches the caller unmodified.
#[derive(Debug, Error)]
pub enum M2mError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        body: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("token cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("client for '{0}' is closed")]
    Closed(String),
}

impl M2mError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            M2mError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T, E = M2mError> = std::result::Result<T, E>;
