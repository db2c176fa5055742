use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// A catalog page could not be fetched or parsed.
    #[error("Catalog page {page} failed: {message}")]
    Catalog { page: u32, message: String },

    /// The listing pointed back at a page that was already visited.
    #[error("Catalog cursor cycle detected at page {page}: {cursor}")]
    CursorCycle { page: u32, cursor: String },

    #[error("Invalid track {id}: {message}")]
    InvalidTrack { id: String, message: String },
}

pub type Result<T> = std::result::Result<T, LibraryError>;
