//! Spotify Web API response types
//!
//! See: https://developer.spotify.com/documentation/web-api/reference/get-users-saved-tracks

use serde::Deserialize;

/// `GET /v1/me/tracks` response
#[derive(Debug, Deserialize)]
pub struct SavedTracksPage {
    #[serde(default)]
    pub items: Vec<SavedTrackItem>,

    /// Absolute URL of the next page
    pub next: Option<String>,

    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SavedTrackItem {
    /// RFC 3339 timestamp
    pub added_at: Option<String>,

    /// `null` for tracks no longer available
    pub track: Option<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
pub struct SpotifyTrack {
    /// `null` for local files
    pub id: Option<String>,

    pub name: String,

    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,

    pub album: Option<SpotifyAlbum>,

    #[serde(default)]
    pub duration_ms: u64,

    pub popularity: Option<u32>,

    #[serde(default)]
    pub external_ids: SpotifyExternalIds,
}

#[derive(Debug, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpotifyExternalIds {
    pub isrc: Option<String>,
}

/// Error envelope: `{"error": {"status": 401, "message": "..."}}`
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub status: Option<u16>,
    pub message: String,
}
