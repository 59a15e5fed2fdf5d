use repodeck_api::GitHubError;
use repodeck_store::StoreError;
use thiserror::Error;

/// All the ways things can go wrong in RepoDeck
#[derive(Error, Debug)]
pub enum Error {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: Option<u64> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StoreError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<GitHubError> for Error {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::RateLimitExceeded { retry_after } => {
                Error::RateLimitExceeded { retry_after }
            }
            GitHubError::NotFound(what) => Error::NotFound(what),
            other => Error::ApiError(other.to_string()),
        }
    }
}
