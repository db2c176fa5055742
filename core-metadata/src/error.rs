use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    JsonParse(String),

    #[error("Remote API error: {0}")]
    RemoteApi(String),

    #[error("{provider} rate limit exceeded")]
    RateLimited {
        provider: &'static str,
        retry_after_seconds: Option<u64>,
    },

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(&'static str),

    #[error("{provider} interval of {interval_ms}ms is below the {floor_ms}ms floor")]
    IntervalBelowFloor {
        provider: &'static str,
        interval_ms: u64,
        floor_ms: u64,
    },

    #[error("Unknown enrichment mode: {0}")]
    InvalidMode(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
