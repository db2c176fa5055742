//! End-to-end enrichment runs against a scripted HTTP backend.
//!
//! Seven tracks, three with an ISRC. MusicBrainz answers two of the three
//! (the third gets a 503), Last.fm has tags for four tracks, and the
//! generative endpoint names a genre for one of the two untagged tracks.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_library::TrackRef;
use core_metadata::{
    EnrichmentMode, EnrichmentService, GenerativeClient, LastFmClient, MusicBrainzClient,
    ProviderKind,
};
use core_runtime::config::SchedulingConfig;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    MusicBrainz,
    LastFm,
    Generative,
}

#[derive(Debug, Clone)]
struct Call {
    route: Route,
    url: String,
    at: Instant,
}

/// Routes by host, answers from fixed fixtures and records every call.
#[derive(Default)]
struct ScriptedHttpClient {
    calls: Mutex<Vec<Call>>,
}

impl ScriptedHttpClient {
    fn calls(&self, route: Route) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.route == route)
            .cloned()
            .collect()
    }

    fn musicbrainz(url: &str) -> HttpResponse {
        let body = if url.contains("isrc%3AISRC0001") {
            r#"{"recordings": [{"id": "mb-1", "title": "Track One", "length": 201000,
                "tags": [{"count": 4, "name": "Rock"}, {"count": 1, "name": "shoegaze"}]}]}"#
        } else if url.contains("isrc%3AISRC0002") {
            r#"{"recordings": [{"id": "mb-2", "title": "Track Two",
                "tags": [{"count": 2, "name": "jazz"}]}]}"#
        } else {
            return HttpResponse::new(503, Bytes::new());
        };
        HttpResponse::new(200, Bytes::from(body))
    }

    fn lastfm(url: &str) -> HttpResponse {
        let tags: &[&str] = if url.contains("track=Track%20One") {
            &["rock", "indie rock"]
        } else if url.contains("track=Track%20Three") {
            &["pop"]
        } else if url.contains("track=Track%20Four") {
            &["folk"]
        } else if url.contains("track=Track%20Five") {
            &["electronic"]
        } else if url.contains("track=Track%20Six") {
            return HttpResponse::new(
                200,
                Bytes::from_static(br#"{"error": 6, "message": "Track not found"}"#),
            );
        } else {
            &[]
        };

        let body = serde_json::json!({
            "track": {
                "name": "x",
                "duration": "0",
                "listeners": "1000",
                "playcount": "5000",
                "toptags": {"tag": tags.iter().map(|t| serde_json::json!({"name": t})).collect::<Vec<_>>()}
            }
        });
        HttpResponse::new(200, Bytes::from(serde_json::to_vec(&body).unwrap()))
    }

    fn generative(request: &HttpRequest) -> HttpResponse {
        let prompt = String::from_utf8_lossy(request.body.as_deref().unwrap_or_default()).to_string();
        let content = if prompt.contains("Track Six") {
            r#"{"primary_genre": "synthwave", "subgenres": ["outrun"], "confidence": 0.8}"#
        } else {
            r#"{"primary_genre": null, "subgenres": [], "confidence": 0.2}"#
        };
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}],
            "usage": {"total_tokens": 100}
        });
        HttpResponse::new(200, Bytes::from(serde_json::to_vec(&body).unwrap()))
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let route = if request.url.contains("musicbrainz.org") {
            Route::MusicBrainz
        } else if request.url.contains("audioscrobbler.com") {
            Route::LastFm
        } else {
            Route::Generative
        };

        self.calls.lock().unwrap().push(Call {
            route,
            url: request.url.clone(),
            at: Instant::now(),
        });

        Ok(match route {
            Route::MusicBrainz => Self::musicbrainz(&request.url),
            Route::LastFm => Self::lastfm(&request.url),
            Route::Generative => Self::generative(&request),
        })
    }
}

fn library() -> Vec<TrackRef> {
    let titles = ["One", "Two", "Three", "Four", "Five", "Six", "Seven"];
    titles
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let track = TrackRef::new(format!("t{}", i + 1), format!("Track {}", name), "Test Artist")
                .with_duration_ms(180_000)
                .with_popularity(50);
            if i < 3 {
                track.with_isrc(format!("ISRC000{}", i + 1))
            } else {
                track
            }
        })
        .collect()
}

fn service(http: Arc<ScriptedHttpClient>) -> EnrichmentService {
    let http: Arc<dyn HttpClient> = http;
    EnrichmentService::new(SchedulingConfig::default())
        .with_musicbrainz(Arc::new(MusicBrainzClient::new(
            Arc::clone(&http),
            "vibecheck-test/0.1 (qa@example.com)".to_string(),
            1000,
        )))
        .with_listener_stats(Arc::new(LastFmClient::new(Arc::clone(&http), "lastfm-key".to_string())))
        .with_generative(Arc::new(GenerativeClient::new(http, "sk-test".to_string(), 100)))
}

#[tokio::test(start_paused = true)]
async fn test_ai_enhanced_end_to_end() {
    let http = Arc::new(ScriptedHttpClient::default());
    let report = service(Arc::clone(&http))
        .enrich(library(), EnrichmentMode::AiEnhanced)
        .await
        .unwrap();

    let stats = &report.stats;
    assert_eq!(stats.total_songs, 7);
    assert_eq!(stats.songs_with_musicbrainz, 2);
    assert_eq!(stats.songs_with_listener_stats, 6);
    assert_eq!(stats.songs_enhanced_with_ai, 1);
    assert_eq!(stats.songs_with_ai, 1);
    assert_eq!(stats.total_tokens_used, 200);
    // 0.2 and 0.8
    assert!((stats.average_ai_confidence - 0.5).abs() < 1e-9);
    assert_eq!(stats.average_popularity, 50);

    // Only tracks with an ISRC reach MusicBrainz.
    assert_eq!(http.calls(Route::MusicBrainz).len(), 3);
    assert!(http
        .calls(Route::MusicBrainz)
        .iter()
        .all(|c| c.url.contains("isrc%3AISRC000")));
    assert_eq!(http.calls(Route::LastFm).len(), 7);
    // Track Six and Track Seven had no structured tags.
    assert_eq!(http.calls(Route::Generative).len(), 2);

    let ids: Vec<&str> = report.records.iter().map(|r| r.track.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t2", "t3", "t4", "t5", "t6", "t7"]);

    let first = &report.records[0].merged;
    assert_eq!(first.genres, vec!["Rock", "shoegaze", "indie rock"]);
    assert_eq!(
        first.genre_sources,
        vec![ProviderKind::MusicBrainz, ProviderKind::ListenerStats]
    );
    assert_eq!(first.best_duration_ms, 201_000);

    let sixth = &report.records[5].merged;
    assert_eq!(sixth.genres, vec!["synthwave", "outrun"]);
    assert!(sixth.used_fallback);
    assert!(report.records[5].listener_stats.is_none());

    let seventh = &report.records[6].merged;
    assert!(seventh.genres.is_empty());
    assert!(!seventh.used_fallback);
    assert_eq!(seventh.best_duration_ms, 180_000);
}

#[tokio::test(start_paused = true)]
async fn test_musicbrainz_paced_without_blocking_listener_stats() {
    let http = Arc::new(ScriptedHttpClient::default());
    let start = Instant::now();

    service(Arc::clone(&http))
        .enrich(library(), EnrichmentMode::Hybrid)
        .await
        .unwrap();

    let mb_calls = http.calls(Route::MusicBrainz);
    assert_eq!(mb_calls.len(), 3);
    for pair in mb_calls.windows(2) {
        assert!(pair[1].at - pair[0].at >= Duration::from_millis(1000));
    }

    // The whole first batch of Last.fm lookups went out immediately.
    let lastfm_calls = http.calls(Route::LastFm);
    assert_eq!(lastfm_calls.len(), 7);
    assert!(lastfm_calls[..5].iter().all(|c| c.at == start));
    // Second batch waits for the slowest first-batch track plus the batch delay.
    assert!(lastfm_calls[5].at - start >= Duration::from_millis(3000));

    assert!(http.calls(Route::Generative).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_musicbrainz_only_runs_sequentially() {
    let http = Arc::new(ScriptedHttpClient::default());
    let start = Instant::now();

    let report = service(Arc::clone(&http))
        .enrich(library(), EnrichmentMode::MusicBrainzOnly)
        .await
        .unwrap();

    assert_eq!(report.stats.songs_with_musicbrainz, 2);
    assert_eq!(report.stats.songs_with_listener_stats, 0);
    assert!(http.calls(Route::LastFm).is_empty());
    assert!(start.elapsed() >= Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn test_generative_answers_reused_across_runs() {
    let http = Arc::new(ScriptedHttpClient::default());
    let service = service(Arc::clone(&http));

    let first = service.enrich(library(), EnrichmentMode::AiEnhanced).await.unwrap();
    let second = service.enrich(library(), EnrichmentMode::AiEnhanced).await.unwrap();

    assert_eq!(http.calls(Route::Generative).len(), 2);
    assert_eq!(first.stats.songs_enhanced_with_ai, second.stats.songs_enhanced_with_ai);
    assert_ne!(first.run_id, second.run_id);
}
