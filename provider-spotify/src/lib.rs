//! # Spotify Catalog Provider
//!
//! Implements [`CatalogSource`](core_library::CatalogSource) for the Spotify
//! Web API saved-tracks listing (`GET /v1/me/tracks`).
//!
//! ## Overview
//!
//! - Bearer-token authenticated page fetches
//! - The absolute `next` URL returned by each page is the cursor
//! - Exponential backoff on 429 and 5xx, honoring `Retry-After`
//! - Entries without a playable track (removed or local files) are skipped

pub mod connector;
pub mod error;
pub mod types;

pub use connector::SpotifyConnector;
pub use error::{Result, SpotifyError};
