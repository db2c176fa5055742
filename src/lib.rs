//! Workspace umbrella crate.
//!
//! Re-exports the enrichment core so a host can depend on
//! `vibecheck-workspace` alone. The `desktop-shims` feature (on by default)
//! also pulls in [`core_service`] with a reqwest-backed HTTP client.

pub use core_metadata;

#[cfg(feature = "desktop-shims")]
pub use core_service;

#[cfg(feature = "desktop-shims")]
pub use core_service::{CoreError, CoreService};

pub use core_metadata::{AggregateStats, EnrichmentMode, EnrichmentReport};
