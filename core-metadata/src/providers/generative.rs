//! Generative genre classification
//!
//! Asks an OpenAI-compatible chat-completions endpoint to classify a track
//! and normalizes whatever comes back into a [`GenerativeResult`].
//!
//! ## Endpoint
//!
//! - **Chat completions**: `POST {base_url}/chat/completions` with JSON mode
//!   (`response_format: {"type": "json_object"}`)
//!
//! ## Caching and pacing
//!
//! The memoization cache is consulted before anything else; a hit issues no
//! request and does not touch the limiter. Misses are paced by a soft
//! minimum interval (100ms by default). Only successful classifications are
//! cached, so a failed lookup is retried on the next run.
//!
//! ## Response hygiene
//!
//! The model's JSON is untrusted: a missing or mistyped field falls back to
//! its default (`None`, empty list, confidence `0.5`) instead of failing the
//! lookup. Only a transport failure, a non-2xx status or content that is not
//! a JSON object makes the lookup absent.

use super::{GenerativeResult, LookupQuery, MetadataProvider, ProviderKind, ProviderResult};
use crate::cache::{CacheKey, GenerativeCache};
use crate::error::{MetadataError, Result};
use crate::rate_limiter::RateLimiter;
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use core_runtime::config::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_TOKENS: u32 = 300;
const TEMPERATURE: f32 = 0.3;
const DEFAULT_CONFIDENCE: f64 = 0.5;

const SYSTEM_PROMPT: &str = "You are a music expert specializing in genre classification. \
Provide accurate, specific genre information in the requested JSON format only. \
Do not include any additional text outside the JSON response.";

fn user_prompt(artist: &str, title: &str) -> String {
    format!(
        r#"Analyze the song "{title}" by "{artist}" and provide genre information.

Please respond with a JSON object in this exact format:
{{
    "primary_genre": "main genre (e.g., rock, pop, jazz)",
    "subgenres": ["subgenre1", "subgenre2", "subgenre3"],
    "confidence": 0.95,
    "era": "decade when this style was most popular (e.g., 1980s, 2000s)",
    "characteristics": "brief description of musical characteristics",
    "related_artists": ["similar artist 1", "similar artist 2"]
}}

Be specific with genres (e.g., "indie rock" instead of just "rock", "synthwave" instead of just "electronic"). Include 2-4 relevant subgenres. Confidence should be between 0.1 and 1.0."#
    )
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

// =============================================================================
// Normalization
// =============================================================================

fn text_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn list_field(fields: &Map<String, Value>, name: &str) -> Vec<String> {
    match fields.get(name) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn confidence_field(fields: &Map<String, Value>) -> f64 {
    fields
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE)
}

/// Turns the model's message content into a result with defaults applied.
pub(crate) fn normalize_content(content: &str, tokens_used: u64) -> Result<GenerativeResult> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| MetadataError::JsonParse(format!("Model content is not JSON: {}", e)))?;

    let Value::Object(fields) = value else {
        return Err(MetadataError::InvalidResponse(
            "Model content is not a JSON object".to_string(),
        ));
    };

    Ok(GenerativeResult {
        primary_genre: text_field(&fields, "primary_genre"),
        subgenres: list_field(&fields, "subgenres"),
        confidence: confidence_field(&fields),
        era: text_field(&fields, "era"),
        characteristics: text_field(&fields, "characteristics"),
        related_artists: list_field(&fields, "related_artists"),
        tokens_used,
    })
}

// =============================================================================
// Client
// =============================================================================

pub struct GenerativeClient {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    model: String,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
    cache: Arc<GenerativeCache>,
}

impl GenerativeClient {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: String, min_interval_ms: u64) -> Self {
        Self {
            http_client,
            api_key,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            rate_limiter: Arc::new(RateLimiter::from_millis("generative", min_interval_ms)),
            cache: Arc::new(GenerativeCache::new()),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Shares a cache with other clients or with the owning service.
    pub fn with_cache(mut self, cache: Arc<GenerativeCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<GenerativeCache> {
        &self.cache
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Classifies one track, bypassing the cache.
    pub async fn classify(&self, artist: &str, title: &str) -> Result<GenerativeResult> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(artist, title),
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let request = HttpRequest::post(format!("{}/chat/completions", self.base_url))
            .bearer_token(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)?;

        self.rate_limiter.acquire().await;
        debug!("Requesting generative classification for '{} - {}'", artist, title);

        let response = self.http_client.execute(request).await.map_err(|e| {
            MetadataError::NetworkError(format!("Generative request failed: {}", e))
        })?;

        if !response.is_success() {
            if response.status == 429 {
                return Err(MetadataError::RateLimited {
                    provider: "OpenAI",
                    retry_after_seconds: response.retry_after().map(|d| d.as_secs()),
                });
            }

            let body = response
                .json::<ApiErrorResponse>()
                .map(|e| e.error.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).to_string());
            return Err(MetadataError::HttpError {
                status: response.status,
                body,
            });
        }

        let chat: ChatResponse = serde_json::from_slice(&response.body).map_err(|e| {
            MetadataError::JsonParse(format!("Failed to parse completion: {}", e))
        })?;

        let tokens_used = chat.usage.and_then(|u| u.total_tokens).unwrap_or(0);
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| MetadataError::InvalidResponse("Empty completion".to_string()))?;

        normalize_content(&content, tokens_used)
    }
}

#[async_trait]
impl MetadataProvider for GenerativeClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Generative
    }

    #[instrument(skip(self, query), fields(artist = %query.artist, title = %query.title))]
    async fn lookup(&self, query: &LookupQuery) -> Option<ProviderResult> {
        let key = CacheKey::new(&query.artist, &query.title);
        if let Some(cached) = self.cache.get(&key) {
            debug!(key = %key, "Using cached generative result");
            return Some(ProviderResult::Generative(cached));
        }

        match self.classify(&query.artist, &query.title).await {
            Ok(result) => {
                info!(
                    primary_genre = ?result.primary_genre,
                    confidence = result.confidence,
                    tokens = result.tokens_used,
                    "Generative classification"
                );
                self.cache.insert(key, result.clone());
                Some(ProviderResult::Generative(result))
            }
            Err(e) => {
                warn!(error = %e, "Generative lookup failed");
                None
            }
        }
    }
}
