//! MusicBrainz API Client
//!
//! Looks up recordings by ISRC and returns the first match with its tags.
//!
//! ## API Endpoint
//!
//! - **ISRC search**: `https://musicbrainz.org/ws/2/recording/?query=isrc:{isrc}&fmt=json`
//!
//! ## Rate Limiting
//!
//! MusicBrainz allows one request per second per client. The client takes a
//! shared [`RateLimiter`] whose interval is clamped to that floor, so every
//! task in a run that talks to MusicBrainz is paced globally, not per task.
//!
//! ## User Agent Requirement
//!
//! Every request carries the configured User-Agent
//! (`"ApplicationName/Version (Contact)"`); anonymous clients are throttled
//! aggressively.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::providers::musicbrainz::MusicBrainzClient;
//!
//! let client = MusicBrainzClient::new(
//!     http_client,
//!     "vibecheck/0.1 (contact@example.com)".to_string(),
//!     1000,
//! );
//!
//! let recording = client.fetch_by_isrc("USUM71703861").await?;
//! ```

use super::{LookupQuery, MetadataProvider, MusicBrainzResult, ProviderKind, ProviderResult};
use crate::error::{MetadataError, Result};
use crate::rate_limiter::RateLimiter;
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use core_runtime::config::MUSICBRAINZ_MIN_INTERVAL_FLOOR_MS;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// MusicBrainz API base URL
const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";

/// Maximum number of recordings to retrieve; only the first is used
const MAX_SEARCH_RESULTS: u32 = 5;

/// Timeout for API requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// MusicBrainz API client
pub struct MusicBrainzClient {
    http_client: Arc<dyn HttpClient>,
    user_agent: String,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

#[derive(Debug, Clone, Deserialize)]
struct Tag {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Recording {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    score: Option<u32>,
    #[serde(default)]
    length: Option<u64>,
    #[serde(default)]
    disambiguation: Option<String>,
    #[serde(default)]
    first_release_date: Option<String>,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    recordings: Vec<Recording>,
}

impl From<Recording> for MusicBrainzResult {
    fn from(recording: Recording) -> Self {
        Self {
            id: recording.id,
            title: recording.title,
            length_ms: recording.length.filter(|&l| l > 0),
            disambiguation: recording.disambiguation.filter(|d| !d.trim().is_empty()),
            first_release_date: recording.first_release_date.filter(|d| !d.trim().is_empty()),
            score: recording.score,
            tags: recording
                .tags
                .into_iter()
                .map(|t| t.name.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

impl MusicBrainzClient {
    /// Creates a client with its own limiter.
    ///
    /// `min_interval_ms` below the 1000ms floor is raised to the floor.
    pub fn new(http_client: Arc<dyn HttpClient>, user_agent: String, min_interval_ms: u64) -> Self {
        let interval = min_interval_ms.max(MUSICBRAINZ_MIN_INTERVAL_FLOOR_MS);
        Self::build(
            http_client,
            user_agent,
            Arc::new(RateLimiter::from_millis("musicbrainz", interval)),
        )
    }

    /// Creates a client pacing through an existing limiter.
    ///
    /// # Errors
    ///
    /// [`MetadataError::IntervalBelowFloor`] when the limiter spaces calls
    /// closer than 1000ms.
    pub fn with_rate_limiter(
        http_client: Arc<dyn HttpClient>,
        user_agent: String,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        let interval_ms = rate_limiter.min_interval().as_millis() as u64;
        if interval_ms < MUSICBRAINZ_MIN_INTERVAL_FLOOR_MS {
            return Err(MetadataError::IntervalBelowFloor {
                provider: "MusicBrainz",
                interval_ms,
                floor_ms: MUSICBRAINZ_MIN_INTERVAL_FLOOR_MS,
            });
        }
        Ok(Self::build(http_client, user_agent, rate_limiter))
    }

    fn build(http_client: Arc<dyn HttpClient>, user_agent: String, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            http_client,
            user_agent,
            base_url: MUSICBRAINZ_API_BASE.to_string(),
            rate_limiter,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Looks up the first recording carrying `isrc`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(_))` - First matching recording
    /// - `Ok(None)` - No recording, or the service is unavailable (503)
    /// - `Err` - Network, HTTP or parse failure
    pub async fn fetch_by_isrc(&self, isrc: &str) -> Result<Option<MusicBrainzResult>> {
        let query = format!("isrc:{}", isrc.trim());
        let url = format!(
            "{}/recording/?query={}&fmt=json&limit={}",
            self.base_url,
            urlencoding::encode(&query),
            MAX_SEARCH_RESULTS
        );

        debug!("Searching MusicBrainz: {}", url);

        self.rate_limiter.acquire().await;

        let request = HttpRequest::get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);

        let response = self.http_client.execute(request).await.map_err(|e| {
            MetadataError::NetworkError(format!("MusicBrainz search failed: {}", e))
        })?;

        match response.status {
            200..=299 => {}
            503 => {
                // Throttled or in maintenance
                warn!("MusicBrainz service unavailable (503)");
                return Ok(None);
            }
            429 => {
                return Err(MetadataError::RateLimited {
                    provider: "MusicBrainz",
                    retry_after_seconds: response.retry_after().map(|d| d.as_secs()),
                });
            }
            status => {
                return Err(MetadataError::HttpError {
                    status,
                    body: String::from_utf8_lossy(&response.body).to_string(),
                });
            }
        }

        let search_result: SearchResponse = serde_json::from_slice(&response.body).map_err(|e| {
            MetadataError::JsonParse(format!("Failed to parse recording search: {}", e))
        })?;

        Ok(search_result
            .recordings
            .into_iter()
            .next()
            .map(MusicBrainzResult::from))
    }
}

#[async_trait]
impl MetadataProvider for MusicBrainzClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::MusicBrainz
    }

    #[instrument(skip(self, query), fields(artist = %query.artist, title = %query.title))]
    async fn lookup(&self, query: &LookupQuery) -> Option<ProviderResult> {
        // No ISRC, no request.
        let isrc = query.isrc.as_deref()?;

        match self.fetch_by_isrc(isrc).await {
            Ok(Some(result)) => {
                info!(isrc, mbid = %result.id, tags = result.tags.len(), "MusicBrainz match");
                Some(ProviderResult::MusicBrainz(result))
            }
            Ok(None) => {
                debug!(isrc, "No MusicBrainz recording");
                None
            }
            Err(e) => {
                warn!(isrc, error = %e, "MusicBrainz lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use mockall::mock;
    use tokio::time::Instant;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
        }
    }

    const RECORDING_BODY: &str = r#"{
        "created": "2024-01-01T00:00:00.000Z",
        "count": 2,
        "recordings": [
            {
                "id": "b1a9c0e9-d987-4042-ae91-78d6a3267d69",
                "score": 100,
                "title": "Midnight City",
                "length": 243960,
                "disambiguation": "",
                "first-release-date": "2011-08-16",
                "tags": [{"count": 3, "name": "electronic"}, {"count": 1, "name": "Synthpop"}]
            },
            {
                "id": "other",
                "score": 90,
                "title": "Midnight City (edit)",
                "tags": [{"count": 1, "name": "dream pop"}]
            }
        ]
    }"#;

    fn client(mock: MockHttpClient) -> MusicBrainzClient {
        MusicBrainzClient::new(Arc::new(mock), "vibecheck-test/0.1 (test@example.com)".into(), 1000)
    }

    fn query() -> LookupQuery {
        LookupQuery::new("M83", "Midnight City").with_isrc("FR6V81141061")
    }

    #[tokio::test]
    async fn test_lookup_takes_first_recording() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .withf(|req| {
                req.url.contains("/recording/?query=isrc%3AFR6V81141061&fmt=json")
                    && req.headers.get("User-Agent").map(String::as_str)
                        == Some("vibecheck-test/0.1 (test@example.com)")
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, Bytes::from_static(RECORDING_BODY.as_bytes()))));

        let result = client(mock_http).lookup(&query()).await.and_then(ProviderResult::into_musicbrainz);
        let result = result.expect("recording");

        assert_eq!(result.id, "b1a9c0e9-d987-4042-ae91-78d6a3267d69");
        assert_eq!(result.length_ms, Some(243960));
        assert_eq!(result.disambiguation, None);
        assert_eq!(result.first_release_date.as_deref(), Some("2011-08-16"));
        assert_eq!(result.tags, vec!["electronic", "Synthpop"]);
    }

    #[tokio::test]
    async fn test_lookup_without_isrc_makes_no_request() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(0);

        let client = client(mock_http);
        let result = client.lookup(&LookupQuery::new("M83", "Midnight City")).await;

        assert!(result.is_none());
        assert_eq!(client.rate_limiter().stats().acquisitions, 0);
    }

    #[tokio::test]
    async fn test_service_unavailable_is_absent() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| Ok(HttpResponse::new(503, Bytes::new())));

        assert!(client(mock_http).lookup(&query()).await.is_none());
    }

    #[tokio::test]
    async fn test_errors_are_absent() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::OperationFailed("connection reset".into())));
        assert!(client(mock_http).lookup(&query()).await.is_none());

        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| Ok(HttpResponse::new(200, Bytes::from_static(b"<html>"))));
        assert!(client(mock_http).lookup(&query()).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_reports_rate_limit() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().returning(|_| {
            Ok(HttpResponse::new(429, Bytes::new()).with_header("Retry-After", "5"))
        });

        let err = client(mock_http).fetch_by_isrc("X").await.unwrap_err();
        assert!(matches!(
            err,
            MetadataError::RateLimited {
                retry_after_seconds: Some(5),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_recordings_is_absent() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| Ok(HttpResponse::new(200, Bytes::from_static(br#"{"recordings": []}"#))));

        assert!(client(mock_http).fetch_by_isrc("X").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_floor_is_enforced() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(3)
            .returning(|_| Ok(HttpResponse::new(200, Bytes::from_static(br#"{"recordings": []}"#))));

        // Asking for 10ms still paces at one second.
        let client = MusicBrainzClient::new(Arc::new(mock_http), "ua/1 (x)".into(), 10);
        let start = Instant::now();
        for _ in 0..3 {
            client.lookup(&query()).await;
        }

        assert!(start.elapsed() >= Duration::from_millis(2000));
    }

    #[test]
    fn test_injected_limiter_below_floor_is_rejected() {
        let fast = Arc::new(RateLimiter::from_millis("musicbrainz", 10));
        let err = MusicBrainzClient::with_rate_limiter(
            Arc::new(MockHttpClient::new()),
            "ua/1 (x)".into(),
            fast,
        )
        .err()
        .expect("limiter below floor");

        assert!(matches!(
            err,
            MetadataError::IntervalBelowFloor {
                interval_ms: 10,
                floor_ms: 1000,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_limiter_paces_every_client() {
        let mut first_http = MockHttpClient::new();
        first_http
            .expect_execute()
            .times(2)
            .returning(|_| Ok(HttpResponse::new(200, Bytes::from_static(br#"{"recordings": []}"#))));
        let mut second_http = MockHttpClient::new();
        second_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, Bytes::from_static(br#"{"recordings": []}"#))));

        let shared = Arc::new(RateLimiter::from_millis("musicbrainz", 1000));
        let first =
            MusicBrainzClient::with_rate_limiter(Arc::new(first_http), "ua/1 (x)".into(), Arc::clone(&shared))
                .unwrap();
        let second =
            MusicBrainzClient::with_rate_limiter(Arc::new(second_http), "ua/1 (x)".into(), Arc::clone(&shared))
                .unwrap();

        let start = Instant::now();
        first.lookup(&query()).await;
        second.lookup(&query()).await;
        first.lookup(&query()).await;

        assert!(start.elapsed() >= Duration::from_millis(2000));
        assert_eq!(shared.stats().acquisitions, 3);
    }
}
