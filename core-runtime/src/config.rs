//! # Core Configuration Module
//!
//! Configuration for the enrichment core.
//!
//! ## Overview
//!
//! A builder assembles a [`CoreConfig`] holding the injected HTTP bridge, the
//! provider credentials ([`MetadataApiConfig`]) and the pacing knobs
//! ([`SchedulingConfig`]). Everything is validated once in
//! [`build()`](CoreConfigBuilder::build); nothing downstream re-checks
//! credentials per call.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, MetadataApiConfig};
//!
//! let config = CoreConfig::builder()
//!     .metadata_api_config(MetadataApiConfig::from_env())
//!     .build()?;
//! ```
//!
//! ## Environment
//!
//! | Variable | Field |
//! |----------|-------|
//! | `LASTFM_API_KEY` | [`MetadataApiConfig::lastfm_api_key`] (required) |
//! | `MUSICBRAINZ_USER_AGENT` | [`MetadataApiConfig::musicbrainz_user_agent`] |
//! | `OPENAI_API_KEY` | [`MetadataApiConfig::openai_api_key`] |
//! | `OPENAI_MODEL` | [`MetadataApiConfig::openai_model`] |
//! | `OPENAI_BASE_URL` | [`MetadataApiConfig::openai_base_url`] |
//! | `CATALOG_URL` | [`CoreConfig::catalog_url`] |

use crate::error::{Error, Result};
use bridge_traits::HttpClient;
use std::sync::Arc;

/// Identifies this client to MusicBrainz when no user agent is configured.
pub const DEFAULT_MUSICBRAINZ_USER_AGENT: &str =
    concat!("vibecheck/", env!("CARGO_PKG_VERSION"), " (library-enrichment)");

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CATALOG_URL: &str = "https://api.spotify.com/v1/me/tracks?limit=50";

/// MusicBrainz rejects clients that exceed one request per second.
pub const MUSICBRAINZ_MIN_INTERVAL_FLOOR_MS: u64 = 1000;

/// Core configuration.
#[derive(Clone)]
pub struct CoreConfig {
    /// HTTP client for catalog and provider requests (optional with desktop default)
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// First page of the saved-tracks listing
    pub catalog_url: String,

    /// Provider credentials and endpoints
    pub metadata_api_config: MetadataApiConfig,

    /// Pacing and batching
    pub scheduling: SchedulingConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field("catalog_url", &self.catalog_url)
            .field("metadata_api_config", &self.metadata_api_config)
            .field("scheduling", &self.scheduling)
            .finish()
    }
}

/// Credentials and endpoints for the metadata providers.
///
/// # Security Note
///
/// API keys are loaded from the environment or injected by the host. Their
/// `Debug` output is masked so a logged config never leaks a key.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MetadataApiConfig {
    /// MusicBrainz user agent string (format: "AppName/Version (Contact)")
    ///
    /// See: https://musicbrainz.org/doc/MusicBrainz_API/Rate_Limiting
    pub musicbrainz_user_agent: Option<String>,

    /// Last.fm API key for track.getInfo
    pub lastfm_api_key: Option<String>,

    /// Key for the OpenAI-compatible chat completions endpoint.
    ///
    /// Optional at startup; only the ai-enhanced mode needs it.
    pub openai_api_key: Option<String>,

    pub openai_model: Option<String>,

    pub openai_base_url: Option<String>,
}

impl std::fmt::Debug for MetadataApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let masked = |value: &Option<String>| value.as_ref().map(|_| "***");
        f.debug_struct("MetadataApiConfig")
            .field("musicbrainz_user_agent", &self.musicbrainz_user_agent)
            .field("lastfm_api_key", &masked(&self.lastfm_api_key))
            .field("openai_api_key", &masked(&self.openai_api_key))
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .finish()
    }
}

impl MetadataApiConfig {
    /// Creates a new MetadataApiConfig with no API keys configured
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every field from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads every field through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            musicbrainz_user_agent: read("MUSICBRAINZ_USER_AGENT"),
            lastfm_api_key: read("LASTFM_API_KEY"),
            openai_api_key: read("OPENAI_API_KEY"),
            openai_model: read("OPENAI_MODEL"),
            openai_base_url: read("OPENAI_BASE_URL"),
        }
    }

    /// Sets the MusicBrainz user agent
    pub fn with_musicbrainz_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.musicbrainz_user_agent = Some(user_agent.into());
        self
    }

    /// Sets the Last.fm API key
    pub fn with_lastfm_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.lastfm_api_key = Some(api_key.into());
        self
    }

    pub fn with_openai_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.openai_api_key = Some(api_key.into());
        self
    }

    pub fn with_openai_model(mut self, model: impl Into<String>) -> Self {
        self.openai_model = Some(model.into());
        self
    }

    pub fn with_openai_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.openai_base_url = Some(base_url.into());
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(ref ua) = self.musicbrainz_user_agent {
            if ua.is_empty() {
                return Err(Error::Config(
                    "MusicBrainz user agent cannot be empty".to_string(),
                ));
            }
            if !ua.contains('/') || !ua.contains('(') || !ua.contains(')') {
                return Err(Error::Config(
                    "MusicBrainz user agent must follow format: 'AppName/Version (Contact)'"
                        .to_string(),
                ));
            }
        }

        if !self.has_lastfm() {
            return Err(Error::Config(
                "Last.fm API key is required. Set LASTFM_API_KEY or use .with_lastfm_api_key()."
                    .to_string(),
            ));
        }

        if let Some(ref base_url) = self.openai_base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(Error::Config(format!(
                    "OpenAI base URL must be an http(s) URL, got '{}'",
                    base_url
                )));
            }
        }

        Ok(())
    }

    /// User agent sent to MusicBrainz, falling back to the crate default.
    pub fn musicbrainz_user_agent(&self) -> &str {
        self.musicbrainz_user_agent
            .as_deref()
            .unwrap_or(DEFAULT_MUSICBRAINZ_USER_AGENT)
    }

    pub fn openai_model(&self) -> &str {
        self.openai_model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL)
    }

    pub fn openai_base_url(&self) -> &str {
        self.openai_base_url
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_BASE_URL)
            .trim_end_matches('/')
    }

    /// Checks if Last.fm is configured
    pub fn has_lastfm(&self) -> bool {
        self.lastfm_api_key.is_some()
    }

    /// Checks if the generative provider is configured
    pub fn has_openai(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

/// Pacing and batching applied to provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingConfig {
    /// Minimum spacing between two MusicBrainz calls. Never below 1000.
    pub musicbrainz_min_interval_ms: u64,

    /// Minimum spacing between two generative calls.
    pub generative_min_interval_ms: u64,

    /// Tracks looked up concurrently per batch.
    pub batch_size: usize,

    /// Pause between two batches.
    pub batch_delay_ms: u64,

    /// Tracks sent to the generative provider per batch.
    pub generative_batch_size: usize,

    pub generative_batch_delay_ms: u64,

    /// Retries for a throttled or failing catalog page before the run fails.
    pub max_page_retries: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            musicbrainz_min_interval_ms: MUSICBRAINZ_MIN_INTERVAL_FLOOR_MS,
            generative_min_interval_ms: 100,
            batch_size: 5,
            batch_delay_ms: 1000,
            generative_batch_size: 5,
            generative_batch_delay_ms: 500,
            max_page_retries: 3,
        }
    }
}

impl SchedulingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.musicbrainz_min_interval_ms < MUSICBRAINZ_MIN_INTERVAL_FLOOR_MS {
            return Err(Error::Config(format!(
                "MusicBrainz interval must be at least {}ms, got {}ms",
                MUSICBRAINZ_MIN_INTERVAL_FLOOR_MS, self.musicbrainz_min_interval_ms
            )));
        }

        if self.batch_size == 0 {
            return Err(Error::Config(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if self.generative_batch_size == 0 {
            return Err(Error::Config(
                "Generative batch size must be greater than 0".to_string(),
            ));
        }

        if self.batch_delay_ms > 60_000 || self.generative_batch_delay_ms > 60_000 {
            return Err(Error::Config(
                "Batch delay exceeds maximum of 60 seconds (60,000ms)".to_string(),
            ));
        }

        Ok(())
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if !self.catalog_url.starts_with("http://") && !self.catalog_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "Catalog URL must be an http(s) URL, got '{}'",
                self.catalog_url
            )));
        }

        self.metadata_api_config.validate()?;
        self.scheduling.validate()?;

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new()?);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Tests and embedders: inject one with .http_client()."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    catalog_url: Option<String>,
    metadata_api_config: Option<MetadataApiConfig>,
    scheduling: Option<SchedulingConfig>,
}

impl CoreConfigBuilder {
    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the first page of the catalog listing.
    ///
    /// Default: [`DEFAULT_CATALOG_URL`], or `CATALOG_URL` via [`from_env`](Self::from_env).
    pub fn catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = Some(url.into());
        self
    }

    /// Sets the metadata API configuration.
    ///
    /// ```ignore
    /// let api_config = MetadataApiConfig::new()
    ///     .with_musicbrainz_user_agent("MyApp/1.0 (contact@example.com)")
    ///     .with_lastfm_api_key("your_api_key");
    ///
    /// let builder = CoreConfig::builder().metadata_api_config(api_config);
    /// ```
    pub fn metadata_api_config(mut self, config: MetadataApiConfig) -> Self {
        self.metadata_api_config = Some(config);
        self
    }

    pub fn scheduling(mut self, scheduling: SchedulingConfig) -> Self {
        self.scheduling = Some(scheduling);
        self
    }

    /// Loads the credentials and catalog URL from the environment.
    ///
    /// Values set explicitly before this call are kept.
    pub fn from_env(mut self) -> Self {
        if self.metadata_api_config.is_none() {
            self.metadata_api_config = Some(MetadataApiConfig::from_env());
        }
        if self.catalog_url.is_none() {
            self.catalog_url = std::env::var("CATALOG_URL")
                .ok()
                .filter(|url| !url.trim().is_empty());
        }
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] for a missing Last.fm key or an invalid value
    /// - [`Error::CapabilityMissing`] when no HTTP client is available
    pub fn build(self) -> Result<CoreConfig> {
        let metadata_api_config = self.metadata_api_config.unwrap_or_default();
        metadata_api_config.validate()?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let config = CoreConfig {
            http_client: Some(http_client),
            catalog_url: self
                .catalog_url
                .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string()),
            metadata_api_config,
            scheduling: self.scheduling.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}
