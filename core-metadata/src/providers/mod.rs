//! Metadata providers.
//!
//! Each provider answers a [`LookupQuery`] with a typed result or nothing.
//! Failures never cross this boundary: a provider that errors, times out or
//! finds no match reports absence and logs why.

pub mod generative;
pub mod lastfm;
pub mod musicbrainz;

use async_trait::async_trait;
use core_library::TrackRef;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use generative::GenerativeClient;
pub use lastfm::LastFmClient;
pub use musicbrainz::MusicBrainzClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    MusicBrainz,
    ListenerStats,
    Generative,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::MusicBrainz => "musicbrainz",
            ProviderKind::ListenerStats => "listenerstats",
            ProviderKind::Generative => "generative",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a provider is asked about one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    pub artist: String,
    pub title: String,
    pub isrc: Option<String>,
}

impl LookupQuery {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            isrc: None,
        }
    }

    pub fn with_isrc(mut self, isrc: impl Into<String>) -> Self {
        self.isrc = Some(isrc.into());
        self
    }
}

impl From<&TrackRef> for LookupQuery {
    fn from(track: &TrackRef) -> Self {
        Self {
            artist: track.primary_artist().to_string(),
            title: track.title.clone(),
            isrc: track.isrc().map(str::to_string),
        }
    }
}

// =============================================================================
// Result types
// =============================================================================

/// First MusicBrainz recording matching a track's ISRC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicBrainzResult {
    pub id: String,
    pub title: String,
    pub length_ms: Option<u64>,
    pub disambiguation: Option<String>,
    pub first_release_date: Option<String>,
    pub score: Option<u32>,
    pub tags: Vec<String>,
}

/// Listener statistics and community tags from Last.fm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerStatsResult {
    pub name: String,
    pub url: Option<String>,
    /// Raw duration string as reported; `"0"` when unknown.
    pub duration_ms: Option<String>,
    pub listener_count: Option<u64>,
    pub play_count: Option<u64>,
    pub tags: Vec<String>,
    pub summary: Option<String>,
}

impl ListenerStatsResult {
    /// Duration in ms; zero and unparsable values count as unknown.
    pub fn parsed_duration_ms(&self) -> Option<u64> {
        self.duration_ms
            .as_deref()
            .and_then(|d| d.trim().parse::<u64>().ok())
            .filter(|&d| d > 0)
    }
}

/// Genre guess from the generative model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerativeResult {
    pub primary_genre: Option<String>,
    pub subgenres: Vec<String>,
    /// In `[0, 1]`; 0.5 when the model gave no usable value.
    pub confidence: f64,
    pub era: Option<String>,
    pub characteristics: Option<String>,
    pub related_artists: Vec<String>,
    pub tokens_used: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum ProviderResult {
    MusicBrainz(MusicBrainzResult),
    ListenerStats(ListenerStatsResult),
    Generative(GenerativeResult),
}

impl ProviderResult {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderResult::MusicBrainz(_) => ProviderKind::MusicBrainz,
            ProviderResult::ListenerStats(_) => ProviderKind::ListenerStats,
            ProviderResult::Generative(_) => ProviderKind::Generative,
        }
    }

    pub fn into_musicbrainz(self) -> Option<MusicBrainzResult> {
        match self {
            ProviderResult::MusicBrainz(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_listener_stats(self) -> Option<ListenerStatsResult> {
        match self {
            ProviderResult::ListenerStats(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_generative(self) -> Option<GenerativeResult> {
        match self {
            ProviderResult::Generative(r) => Some(r),
            _ => None,
        }
    }
}

/// A metadata source the enrichment pipeline can ask about one track.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// `None` when the provider has no answer, for whatever reason.
    async fn lookup(&self, query: &LookupQuery) -> Option<ProviderResult>;
}
