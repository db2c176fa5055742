//! Façade tests: catalog walk, enrichment and cache management over a
//! scripted HTTP backend.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_library::LibraryError;
use core_metadata::{EnrichmentMode, MetadataError};
use core_runtime::config::{CoreConfig, MetadataApiConfig, SchedulingConfig};
use core_runtime::events::{CatalogEvent, CoreEvent, EnrichmentEvent};
use core_service::{CoreError, CoreService};
use std::sync::{Arc, Mutex};

const PAGE_ONE: &str = r#"{
    "items": [
        {"added_at": "2024-05-01T10:00:00Z", "track": {
            "id": "sp1", "name": "Midnight City", "artists": [{"name": "M83"}],
            "album": {"name": "Hurry Up, We're Dreaming"}, "duration_ms": 243000,
            "popularity": 70, "external_ids": {"isrc": "FR6V81141061"}}},
        {"added_at": "2024-05-02T10:00:00Z", "track": null},
        {"added_at": "2024-05-03T10:00:00Z", "track": {
            "id": "sp2", "name": "Motion Sickness", "artists": [{"name": "Phoebe Bridgers"}],
            "duration_ms": 229000, "popularity": 60, "external_ids": {}}}
    ],
    "next": "https://api.spotify.com/v1/me/tracks?offset=50&limit=50",
    "total": 3
}"#;

const PAGE_TWO: &str = r#"{
    "items": [
        {"added_at": "2024-05-04T10:00:00Z", "track": {
            "id": "sp3", "name": "Untitled Demo", "artists": [{"name": "Nobody"}],
            "duration_ms": 120000, "popularity": 5, "external_ids": {}}}
    ],
    "next": null,
    "total": 3
}"#;

#[derive(Default)]
struct ScriptedHttpClient {
    requests: Mutex<Vec<HttpRequest>>,
    catalog_down: bool,
}

impl ScriptedHttpClient {
    fn failing_catalog() -> Self {
        Self {
            catalog_down: true,
            ..Self::default()
        }
    }

    fn count(&self, host: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.contains(host))
            .count()
    }

    fn json(body: serde_json::Value) -> HttpResponse {
        HttpResponse::new(200, Bytes::from(serde_json::to_vec(&body).unwrap()))
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        if url.contains("api.spotify.com") {
            if self.catalog_down {
                return Ok(HttpResponse::new(500, Bytes::from_static(b"upstream error")));
            }
            let body = if url.contains("offset=50") { PAGE_TWO } else { PAGE_ONE };
            return Ok(HttpResponse::new(200, Bytes::from(body)));
        }

        if url.contains("musicbrainz.org") {
            return Ok(Self::json(serde_json::json!({
                "recordings": [{"id": "mb-1", "title": "Midnight City", "length": 244000,
                    "tags": [{"count": 5, "name": "synthpop"}]}]
            })));
        }

        if url.contains("audioscrobbler.com") {
            let tags = if url.contains("Motion%20Sickness") {
                serde_json::json!([{"name": "indie"}, {"name": "Indie Rock"}])
            } else {
                serde_json::json!([])
            };
            return Ok(Self::json(serde_json::json!({
                "track": {"name": "x", "listeners": "500", "playcount": "900", "toptags": {"tag": tags}}
            })));
        }

        let content = r#"{"primary_genre": "lo-fi", "subgenres": ["bedroom pop"], "confidence": 0.6}"#;
        Ok(Self::json(serde_json::json!({
            "choices": [{"message": {"content": content}}],
            "usage": {"total_tokens": 80}
        })))
    }
}

fn core(http: Arc<ScriptedHttpClient>, api: MetadataApiConfig) -> CoreService {
    let config = CoreConfig::builder()
        .http_client(http)
        .metadata_api_config(api)
        .scheduling(SchedulingConfig {
            max_page_retries: 0,
            ..SchedulingConfig::default()
        })
        .build()
        .unwrap();
    CoreService::new(config).unwrap()
}

fn api() -> MetadataApiConfig {
    MetadataApiConfig::new().with_lastfm_api_key("lastfm-key")
}

#[tokio::test(start_paused = true)]
async fn test_enrich_library_hybrid() {
    let http = Arc::new(ScriptedHttpClient::default());
    let core = core(Arc::clone(&http), api());
    let mut events = core.subscribe();

    let report = core.enrich_library("user-token", EnrichmentMode::Hybrid).await.unwrap();

    let ids: Vec<&str> = report.records.iter().map(|r| r.track.id.as_str()).collect();
    assert_eq!(ids, vec!["sp1", "sp2", "sp3"]);
    assert_eq!(report.records[0].merged.genres, vec!["synthpop"]);
    assert_eq!(report.records[0].merged.best_duration_ms, 244_000);
    assert_eq!(report.records[1].merged.genres, vec!["indie", "Indie Rock"]);
    assert!(report.records[2].merged.genres.is_empty());
    assert_eq!(report.stats.songs_with_musicbrainz, 1);
    // 70, 60, 5
    assert_eq!(report.stats.average_popularity, 45);

    assert_eq!(http.count("api.spotify.com"), 2);
    assert_eq!(http.count("musicbrainz.org"), 1);
    assert!(http
        .requests
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.url.contains("api.spotify.com"))
        .all(|r| r.headers.get("Authorization").map(String::as_str) == Some("Bearer user-token")));

    let mut seen_catalog_completed = false;
    let mut seen_enrichment_completed = false;
    while let Some(Ok(event)) = events.try_recv() {
        match event {
            CoreEvent::Catalog(CatalogEvent::Completed { total_items, pages }) => {
                assert_eq!((total_items, pages), (3, 2));
                seen_catalog_completed = true;
            }
            CoreEvent::Enrichment(EnrichmentEvent::Completed { total_tracks, .. }) => {
                assert_eq!(total_tracks, 3);
                seen_enrichment_completed = true;
            }
            _ => {}
        }
    }
    assert!(seen_catalog_completed && seen_enrichment_completed);
}

#[tokio::test]
async fn test_ai_enhanced_requires_openai_key() {
    let http = Arc::new(ScriptedHttpClient::default());
    let core = core(Arc::clone(&http), api());

    let err = core
        .enrich_library("user-token", EnrichmentMode::AiEnhanced)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoreError::Metadata(MetadataError::ProviderNotConfigured("generative"))
    ));
    assert!(http.requests.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cache_stats_and_clear() {
    let http = Arc::new(ScriptedHttpClient::default());
    let core = core(Arc::clone(&http), api().with_openai_api_key("sk-test"));
    let mut events = core
        .subscribe()
        .filter(|e| matches!(e, CoreEvent::Enrichment(EnrichmentEvent::CacheCleared { .. })));

    let report = core.enrich_library("user-token", EnrichmentMode::AiEnhanced).await.unwrap();

    // Only "Untitled Demo" ends up without structured tags.
    assert_eq!(report.stats.songs_enhanced_with_ai, 1);
    assert_eq!(report.records[2].merged.genres, vec!["lo-fi", "bedroom pop"]);

    let stats = core.cache_stats();
    assert_eq!(stats.entry_count, 1);
    assert_eq!(stats.keys, vec!["nobody-untitled demo"]);

    assert_eq!(core.clear_cache(), 1);
    assert_eq!(core.cache_stats().entry_count, 0);

    match events.try_recv() {
        Some(Ok(CoreEvent::Enrichment(EnrichmentEvent::CacheCleared { entries_removed }))) => {
            assert_eq!(entries_removed, 1)
        }
        other => panic!("expected CacheCleared, got {:?}", other),
    }
}

#[tokio::test]
async fn test_catalog_failure_fails_run() {
    let http = Arc::new(ScriptedHttpClient::failing_catalog());
    let core = core(Arc::clone(&http), api());

    let err = core
        .enrich_library("user-token", EnrichmentMode::ListenerOnly)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Library(LibraryError::Catalog { page: 1, .. })));
    assert_eq!(http.count("audioscrobbler.com"), 0);
}
