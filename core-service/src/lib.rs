//! Core service façade and bootstrap helpers.
//!
//! This crate wires a validated [`CoreConfig`] into the enrichment core: the
//! Spotify catalog connector, the three metadata providers and the shared
//! generative cache. Desktop hosts enable the `desktop-shims` feature so a
//! reqwest-backed HTTP client is supplied when none is injected.
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use core_service::CoreService;
//! use core_metadata::EnrichmentMode;
//!
//! let config = CoreConfig::builder().from_env().build()?;
//! let core = CoreService::new(config)?;
//!
//! let report = core.enrich_library(&token, EnrichmentMode::Hybrid).await?;
//! println!("{} unique genres", report.stats.total_unique_genres);
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::http::HttpClient;
use core_library::{CatalogPaginator, CatalogSource, TrackRef};
use core_metadata::{
    CacheStats, EnrichmentMode, EnrichmentReport, EnrichmentService, GenerativeCache,
    GenerativeClient, LastFmClient, MusicBrainzClient,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EnrichmentEvent, EventBus, EventStream};
use provider_spotify::SpotifyConnector;
use tracing::{info, instrument};

/// Primary façade exposed to host applications.
pub struct CoreService {
    catalog_url: String,
    paginator: CatalogPaginator,
    enrichment: EnrichmentService,
    cache: Arc<GenerativeCache>,
    event_bus: EventBus,
}

impl CoreService {
    /// Builds every provider from `config`.
    ///
    /// The generative provider is only wired when an OpenAI key is present;
    /// without it `ai-enhanced` runs fail with `ProviderNotConfigured`.
    pub fn new(config: CoreConfig) -> Result<Self> {
        let http_client = config
            .http_client
            .clone()
            .ok_or_else(|| CoreError::CapabilityMissing {
                capability: "HttpClient".to_string(),
                message: "CoreConfig carries no HTTP client".to_string(),
            })?;

        let catalog: Arc<dyn CatalogSource> = Arc::new(
            SpotifyConnector::new(Arc::clone(&http_client))
                .with_max_retries(config.scheduling.max_page_retries),
        );

        Self::with_catalog_source(config, http_client, catalog)
    }

    /// Same as [`new`](Self::new) with a caller-supplied catalog backend.
    pub fn with_catalog_source(
        config: CoreConfig,
        http_client: Arc<dyn HttpClient>,
        catalog: Arc<dyn CatalogSource>,
    ) -> Result<Self> {
        let api = &config.metadata_api_config;
        let scheduling = config.scheduling;
        let event_bus = EventBus::default();
        let cache = Arc::new(GenerativeCache::new());

        let lastfm_key = api.lastfm_api_key.clone().ok_or_else(|| {
            CoreError::InitializationFailed("Last.fm API key missing".to_string())
        })?;

        let mut enrichment = EnrichmentService::new(scheduling)
            .with_musicbrainz(Arc::new(MusicBrainzClient::new(
                Arc::clone(&http_client),
                api.musicbrainz_user_agent().to_string(),
                scheduling.musicbrainz_min_interval_ms,
            )))
            .with_listener_stats(Arc::new(LastFmClient::new(
                Arc::clone(&http_client),
                lastfm_key,
            )))
            .with_event_bus(event_bus.clone());

        if let Some(openai_key) = api.openai_api_key.clone() {
            let generative = GenerativeClient::new(
                Arc::clone(&http_client),
                openai_key,
                scheduling.generative_min_interval_ms,
            )
            .with_model(api.openai_model())
            .with_base_url(api.openai_base_url())
            .with_cache(Arc::clone(&cache));
            enrichment = enrichment.with_generative(Arc::new(generative));
        }

        info!(
            catalog = catalog.name(),
            generative = api.has_openai(),
            "Core service initialized"
        );

        Ok(Self {
            catalog_url: config.catalog_url.clone(),
            paginator: CatalogPaginator::new(catalog).with_event_bus(event_bus.clone()),
            enrichment,
            cache,
            event_bus,
        })
    }

    /// Walks the whole saved-tracks listing.
    #[instrument(skip(self, bearer_token))]
    pub async fn fetch_library(&self, bearer_token: &str) -> Result<Vec<TrackRef>> {
        Ok(self.paginator.fetch_all(&self.catalog_url, bearer_token).await?)
    }

    pub async fn enrich(&self, tracks: Vec<TrackRef>, mode: EnrichmentMode) -> Result<EnrichmentReport> {
        Ok(self.enrichment.enrich(tracks, mode).await?)
    }

    /// Fetches the library, then enriches it.
    ///
    /// The mode is checked first so a misconfigured run never touches the
    /// catalog.
    pub async fn enrich_library(&self, bearer_token: &str, mode: EnrichmentMode) -> Result<EnrichmentReport> {
        self.enrichment.plan(mode)?;
        let tracks = self.fetch_library(bearer_token).await?;
        self.enrich(tracks, mode).await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drops every memoized generative answer.
    pub fn clear_cache(&self) -> usize {
        let removed = self.cache.clear();
        info!(entries_removed = removed, "Generative cache cleared");
        self.event_bus
            .emit(CoreEvent::Enrichment(EnrichmentEvent::CacheCleared {
                entries_removed: removed as u64,
            }))
            .ok();
        removed
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
