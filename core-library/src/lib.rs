//! # Library Module
//!
//! The user's saved-track library as the enrichment pipeline sees it.
//!
//! ## Overview
//!
//! - [`TrackRef`](models::TrackRef): one immutable catalog entry
//! - [`CatalogSource`](catalog::CatalogSource): a paginated listing backend
//! - [`CatalogPaginator`](catalog::CatalogPaginator): walks a listing to the
//!   end, in order, with an explicit cursor loop

pub mod catalog;
pub mod error;
pub mod models;

pub use catalog::{CatalogPage, CatalogPaginator, CatalogSource};
pub use error::{LibraryError, Result};
pub use models::{ExternalIds, TrackRef};
