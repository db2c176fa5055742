//! Last.fm API Client
//!
//! Fetches listener statistics and community tags for a track.
//!
//! ## API Endpoint
//!
//! - **Track Info**: `https://ws.audioscrobbler.com/2.0/?method=track.getInfo&api_key={key}&artist={artist}&track={track}&format=json&autocorrect=1`
//!
//! ## Rate Limiting
//!
//! Last.fm is permissive; the enrichment pipeline paces it by batching
//! (five tracks at a time, one second apart) rather than per request.
//!
//! ## API Key Requirement
//!
//! Last.fm requires an API key for all requests.
//! Obtain one at: https://www.last.fm/api/account/create

use super::{ListenerStatsResult, LookupQuery, MetadataProvider, ProviderKind, ProviderResult};
use crate::error::{MetadataError, Result};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Last.fm API base URL
const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";

/// Timeout for API requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Last.fm error code for an unknown track
const ERROR_NOT_FOUND: i32 = 6;

/// Last.fm API client
pub struct LastFmClient {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
}

/// Last.fm sends counters as strings, occasionally as numbers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(u64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    }))
}

/// A single tag is sent as an object instead of a one-element array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TopTags {
    #[serde(default)]
    tag: Option<OneOrMany<Tag>>,
}

#[derive(Debug, Deserialize)]
struct Wiki {
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackInfo {
    name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    duration: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    listeners: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    playcount: Option<String>,
    #[serde(default)]
    toptags: Option<TopTags>,
    #[serde(default)]
    wiki: Option<Wiki>,
}

#[derive(Debug, Deserialize)]
struct TrackResponse {
    track: TrackInfo,
}

/// Last.fm error response
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: i32,
    #[serde(default)]
    message: String,
}

impl From<TrackInfo> for ListenerStatsResult {
    fn from(info: TrackInfo) -> Self {
        let parse_count = |s: Option<String>| s.and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            name: info.name,
            url: info.url.filter(|u| !u.is_empty()),
            duration_ms: info.duration,
            listener_count: parse_count(info.listeners),
            play_count: parse_count(info.playcount),
            tags: info
                .toptags
                .and_then(|t| t.tag)
                .map(OneOrMany::into_vec)
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.name.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            summary: info
                .wiki
                .and_then(|w| w.summary)
                .filter(|s| !s.trim().is_empty()),
        }
    }
}

impl LastFmClient {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: String) -> Self {
        Self {
            http_client,
            api_key,
            base_url: LASTFM_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn track_info_url(&self, artist: &str, track: &str) -> String {
        format!(
            "{}?method=track.getInfo&api_key={}&artist={}&track={}&format=json&autocorrect=1",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(artist),
            urlencoding::encode(track)
        )
    }

    /// Fetches track info.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(_))` - Track found
    /// - `Ok(None)` - Last.fm does not know the track
    /// - `Err` - API error or network failure
    pub async fn fetch_track_info(&self, artist: &str, track: &str) -> Result<Option<ListenerStatsResult>> {
        let url = self.track_info_url(artist, track);
        debug!("Fetching Last.fm track info for '{} - {}'", artist, track);

        let request = HttpRequest::get(url)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| MetadataError::NetworkError(format!("Last.fm request failed: {}", e)))?;

        // Error bodies arrive with both 200 and 4xx statuses.
        if let Ok(error_resp) = serde_json::from_slice::<ErrorResponse>(&response.body) {
            if error_resp.error == ERROR_NOT_FOUND {
                debug!("Track not found on Last.fm: '{} - {}'", artist, track);
                return Ok(None);
            }
            return Err(MetadataError::RemoteApi(format!(
                "Last.fm API error {}: {}",
                error_resp.error, error_resp.message
            )));
        }

        if !response.is_success() {
            if response.status == 429 {
                return Err(MetadataError::RateLimited {
                    provider: "Last.fm",
                    retry_after_seconds: response.retry_after().map(|d| d.as_secs()),
                });
            }

            return Err(MetadataError::HttpError {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).to_string(),
            });
        }

        let track_response: TrackResponse = serde_json::from_slice(&response.body)
            .map_err(|e| MetadataError::JsonParse(format!("Failed to parse Last.fm response: {}", e)))?;

        Ok(Some(track_response.track.into()))
    }
}

#[async_trait]
impl MetadataProvider for LastFmClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ListenerStats
    }

    #[instrument(skip(self, query), fields(artist = %query.artist, title = %query.title))]
    async fn lookup(&self, query: &LookupQuery) -> Option<ProviderResult> {
        match self.fetch_track_info(&query.artist, &query.title).await {
            Ok(Some(stats)) => {
                info!(listeners = ?stats.listener_count, tags = stats.tags.len(), "Last.fm match");
                Some(ProviderResult::ListenerStats(stats))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Last.fm lookup failed");
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

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
        }
    }

    const TRACK_BODY: &str = r#"{
        "track": {
            "name": "Motion Sickness",
            "url": "https://www.last.fm/music/Phoebe+Bridgers/_/Motion+Sickness",
            "duration": "229000",
            "listeners": "812345",
            "playcount": "9876543",
            "toptags": {"tag": [
                {"name": "indie", "url": "https://www.last.fm/tag/indie"},
                {"name": "Indie Rock", "url": "https://www.last.fm/tag/indie+rock"}
            ]},
            "wiki": {"summary": "A song by Phoebe Bridgers."}
        }
    }"#;

    fn client(mock: MockHttpClient) -> LastFmClient {
        LastFmClient::new(Arc::new(mock), "test-key".into())
    }

    fn query() -> LookupQuery {
        LookupQuery::new("Phoebe Bridgers", "Motion Sickness")
    }

    fn ok(body: &'static str) -> bridge_traits::error::Result<HttpResponse> {
        Ok(HttpResponse::new(200, Bytes::from_static(body.as_bytes())))
    }

    #[tokio::test]
    async fn test_lookup_parses_track_info() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .withf(|req| {
                req.url.contains("method=track.getInfo")
                    && req.url.contains("api_key=test-key")
                    && req.url.contains("artist=Phoebe%20Bridgers")
                    && req.url.contains("track=Motion%20Sickness")
                    && req.url.ends_with("&format=json&autocorrect=1")
            })
            .times(1)
            .returning(|_| ok(TRACK_BODY));

        let stats = client(mock_http)
            .lookup(&query())
            .await
            .and_then(ProviderResult::into_listener_stats)
            .expect("stats");

        assert_eq!(stats.listener_count, Some(812345));
        assert_eq!(stats.play_count, Some(9876543));
        assert_eq!(stats.parsed_duration_ms(), Some(229000));
        assert_eq!(stats.tags, vec!["indie", "Indie Rock"]);
        assert_eq!(stats.summary.as_deref(), Some("A song by Phoebe Bridgers."));
    }

    #[tokio::test]
    async fn test_single_tag_and_numeric_counters() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().returning(|_| {
            ok(r#"{"track": {
                "name": "x",
                "duration": 0,
                "listeners": 12,
                "toptags": {"tag": {"name": "shoegaze", "url": ""}}
            }}"#)
        });

        let stats = client(mock_http).fetch_track_info("a", "x").await.unwrap().unwrap();

        assert_eq!(stats.tags, vec!["shoegaze"]);
        assert_eq!(stats.listener_count, Some(12));
        assert_eq!(stats.play_count, None);
        assert_eq!(stats.duration_ms.as_deref(), Some("0"));
        assert_eq!(stats.parsed_duration_ms(), None);
    }

    #[tokio::test]
    async fn test_missing_toptags() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| ok(r#"{"track": {"name": "x", "toptags": {"tag": []}}}"#));

        let stats = client(mock_http).fetch_track_info("a", "x").await.unwrap().unwrap();
        assert!(stats.tags.is_empty());
    }

    #[tokio::test]
    async fn test_not_found_is_absent() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| ok(r#"{"error": 6, "message": "Track not found"}"#));

        let client = client(mock_http);
        assert!(client.fetch_track_info("a", "x").await.unwrap().is_none());
        assert!(client.lookup(&query()).await.is_none());
    }

    #[tokio::test]
    async fn test_api_errors() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| ok(r#"{"error": 10, "message": "Invalid API key"}"#));
        let err = client(mock_http).fetch_track_info("a", "x").await.unwrap_err();
        assert!(matches!(err, MetadataError::RemoteApi(_)));

        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| Ok(HttpResponse::new(500, Bytes::from_static(b"oops"))));
        let err = client(mock_http).fetch_track_info("a", "x").await.unwrap_err();
        assert!(matches!(err, MetadataError::HttpError { status: 500, .. }));

        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| Err(BridgeError::Timeout(30_000)));
        assert!(client(mock_http).lookup(&query()).await.is_none());
    }
}
