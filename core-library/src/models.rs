//! Domain models for the track library

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LibraryError, Result};

/// Artist name used when a catalog entry carries no artist at all.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

// =============================================================================
// External Identifiers
// =============================================================================

/// Industry identifiers attached to a catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIds {
    /// International Standard Recording Code
    pub isrc: Option<String>,
}

impl ExternalIds {
    pub fn with_isrc(isrc: impl Into<String>) -> Self {
        Self {
            isrc: Some(isrc.into()),
        }
    }
}

// =============================================================================
// Track
// =============================================================================

/// A track as fetched from the catalog.
///
/// Never mutated after retrieval; enrichment produces a separate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    /// Catalog identifier
    pub id: String,
    pub title: String,
    /// Credited artists, primary artist first
    pub artists: Vec<String>,
    pub album: Option<String>,
    /// Duration reported by the catalog
    pub duration_ms: u64,
    #[serde(default)]
    pub external_ids: ExternalIds,
    /// When the user saved the track
    pub added_at: Option<DateTime<Utc>>,
    /// Catalog popularity, 0-100
    pub popularity: Option<u32>,
}

impl TrackRef {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artists: vec![artist.into()],
            album: None,
            duration_ms: 0,
            external_ids: ExternalIds::default(),
            added_at: None,
            popularity: None,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_isrc(mut self, isrc: impl Into<String>) -> Self {
        self.external_ids.isrc = Some(isrc.into());
        self
    }

    pub fn with_popularity(mut self, popularity: u32) -> Self {
        self.popularity = Some(popularity);
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_added_at(mut self, added_at: DateTime<Utc>) -> Self {
        self.added_at = Some(added_at);
        self
    }

    /// First credited artist, the one providers are queried with.
    pub fn primary_artist(&self) -> &str {
        self.artists
            .first()
            .map(String::as_str)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(UNKNOWN_ARTIST)
    }

    /// ISRC, if the catalog supplied a non-blank one.
    pub fn isrc(&self) -> Option<&str> {
        self.external_ids
            .isrc
            .as_deref()
            .map(str::trim)
            .filter(|isrc| !isrc.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(LibraryError::InvalidTrack {
                id: self.id.clone(),
                message: "Track id cannot be empty".to_string(),
            });
        }

        if self.title.trim().is_empty() {
            return Err(LibraryError::InvalidTrack {
                id: self.id.clone(),
                message: "Track title cannot be empty".to_string(),
            });
        }

        if let Some(popularity) = self.popularity {
            if popularity > 100 {
                return Err(LibraryError::InvalidTrack {
                    id: self.id.clone(),
                    message: format!("Popularity {} is out of range 0-100", popularity),
                });
            }
        }

        Ok(())
    }
}
