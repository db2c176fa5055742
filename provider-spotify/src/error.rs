//! Error types for the Spotify provider

use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

/// Spotify provider errors
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// Token rejected (401) or missing scope (403)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned a non-retryable error
    #[error("Spotify API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Still throttled after the last retry
    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Spotify operations
pub type Result<T> = std::result::Result<T, SpotifyError>;

impl From<SpotifyError> for LibraryError {
    fn from(error: SpotifyError) -> Self {
        match error {
            SpotifyError::BridgeError(e) => LibraryError::Bridge(e),
            other => LibraryError::Bridge(BridgeError::OperationFailed(other.to_string())),
        }
    }
}
