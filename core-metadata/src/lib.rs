//! # Metadata Enrichment Module
//!
//! Enriches saved tracks with genres and listening statistics from several
//! independent providers and reduces the result into run statistics.
//!
//! ## Overview
//!
//! This module handles:
//! - Provider adapters ([`providers`]): MusicBrainz by ISRC, Last.fm
//!   listener stats, and an OpenAI-compatible generative classifier
//! - Pacing ([`rate_limiter`]) and order-preserving batching ([`scheduler`])
//! - Memoization of generative answers ([`cache`])
//! - Merging per-track results ([`merge`]) and run statistics ([`stats`])
//! - The run orchestrator ([`EnrichmentService`])

pub mod cache;
pub mod enrichment_service;
pub mod error;
pub mod merge;
pub mod providers;
pub mod rate_limiter;
pub mod scheduler;
pub mod stats;

pub use cache::{CacheKey, CacheStats, GenerativeCache};
pub use enrichment_service::{EnrichmentMode, EnrichmentPlan, EnrichmentReport, EnrichmentService};
pub use error::{MetadataError, Result};
pub use merge::{MergedFields, MergedRecord};
pub use providers::{
    GenerativeClient, GenerativeResult, LastFmClient, ListenerStatsResult, LookupQuery,
    MetadataProvider, MusicBrainzClient, MusicBrainzResult, ProviderKind, ProviderResult,
};
pub use rate_limiter::RateLimiter;
pub use scheduler::BatchPolicy;
pub use stats::{AggregateStats, GenreCategory, GenreCount, GenreGroupStats};
