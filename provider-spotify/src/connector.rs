//! Spotify saved-tracks connector

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use chrono::{DateTime, Utc};
use core_library::{CatalogPage, CatalogSource, ExternalIds, TrackRef};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SpotifyError};
use crate::types::{ErrorResponse, SavedTrackItem, SavedTracksPage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Spotify Web API connector
///
/// # Example
///
/// ```ignore
/// use core_library::CatalogPaginator;
/// use provider_spotify::SpotifyConnector;
///
/// let connector = Arc::new(SpotifyConnector::new(http_client));
/// let tracks = CatalogPaginator::new(connector)
///     .fetch_all("https://api.spotify.com/v1/me/tracks?limit=50", &token)
///     .await?;
/// ```
pub struct SpotifyConnector {
    http_client: Arc<dyn HttpClient>,
    retry_policy: RetryPolicy,
}

impl SpotifyConnector {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Retries for a throttled or failing page; 0 disables retrying.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry_policy.max_attempts = max_retries;
        self
    }

    fn parse_timestamp(rfc3339: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(rfc3339)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// `None` for removed tracks, local files and entries that fail
    /// [`TrackRef::validate`], none of which can be enriched.
    fn convert_item(item: SavedTrackItem) -> Option<TrackRef> {
        let track = item.track?;
        let id = track.id?;

        let track_ref = TrackRef {
            id,
            title: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            album: track.album.map(|a| a.name),
            duration_ms: track.duration_ms,
            external_ids: ExternalIds {
                isrc: track.external_ids.isrc,
            },
            added_at: item.added_at.as_deref().and_then(Self::parse_timestamp),
            popularity: track.popularity,
        };

        match track_ref.validate() {
            Ok(()) => Some(track_ref),
            Err(e) => {
                warn!(error = %e, "Skipping invalid catalog entry");
                None
            }
        }
    }

    fn error_message(response: &HttpResponse) -> String {
        response
            .json::<ErrorResponse>()
            .map(|e| e.error.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).into_owned())
    }

    /// GET `url`, retrying 429/5xx and transport failures with backoff.
    #[instrument(skip(self, bearer_token), fields(url = %url))]
    async fn get_with_retry(&self, url: &str, bearer_token: &str) -> Result<HttpResponse> {
        let mut attempt = 0;

        loop {
            let request = HttpRequest::get(url)
                .bearer_token(bearer_token)
                .header("Accept", "application/json")
                .timeout(REQUEST_TIMEOUT);

            let exhausted = attempt >= self.retry_policy.max_attempts;

            let delay = match self.http_client.execute(request).await {
                Ok(response) if response.is_success() => {
                    debug!(status = response.status, "Catalog page fetched");
                    return Ok(response);
                }
                Ok(response) if response.status == 401 || response.status == 403 => {
                    return Err(SpotifyError::AuthenticationFailed(Self::error_message(
                        &response,
                    )));
                }
                Ok(response) if response.is_retryable() => {
                    if exhausted {
                        warn!(status = response.status, attempts = attempt + 1, "Giving up on catalog page");
                        return Err(if response.status == 429 {
                            SpotifyError::RateLimitExceeded {
                                retry_after_seconds: response
                                    .retry_after()
                                    .map(|d| d.as_secs())
                                    .unwrap_or(0),
                            }
                        } else {
                            SpotifyError::ApiError {
                                status_code: response.status,
                                message: format!("Request failed after {} retries", attempt),
                            }
                        });
                    }
                    response
                        .retry_after()
                        .unwrap_or_else(|| self.retry_policy.delay_for(attempt))
                }
                Ok(response) => {
                    warn!(status = response.status, "Catalog request rejected");
                    return Err(SpotifyError::ApiError {
                        status_code: response.status,
                        message: Self::error_message(&response),
                    });
                }
                Err(e) => {
                    if exhausted {
                        warn!(error = %e, attempts = attempt + 1, "Giving up on catalog page");
                        return Err(SpotifyError::NetworkError(e.to_string()));
                    }
                    self.retry_policy.delay_for(attempt)
                }
            };

            attempt += 1;
            warn!(
                attempt,
                max_retries = self.retry_policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Retrying catalog page"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn fetch_page(&self, url: &str, bearer_token: &str) -> Result<CatalogPage> {
        let response = self.get_with_retry(url, bearer_token).await?;

        let page: SavedTracksPage = response.json().map_err(|e| {
            SpotifyError::ParseError(format!("Failed to parse saved tracks page: {}", e))
        })?;

        let listed = page.items.len();
        let items: Vec<TrackRef> = page
            .items
            .into_iter()
            .filter_map(Self::convert_item)
            .collect();

        if items.len() < listed {
            debug!(skipped = listed - items.len(), "Skipped unavailable catalog entries");
        }

        info!(
            items = items.len(),
            total = ?page.total,
            has_next = page.next.is_some(),
            "Listed saved tracks"
        );

        Ok(CatalogPage {
            items,
            next: page.next,
        })
    }
}

#[async_trait]
impl CatalogSource for SpotifyConnector {
    fn name(&self) -> &'static str {
        "spotify"
    }

    async fn list_page(&self, cursor: &str, bearer_token: &str) -> core_library::Result<CatalogPage> {
        Ok(self.fetch_page(cursor, bearer_token).await?)
    }
}
