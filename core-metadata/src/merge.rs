//! Per-track merge of provider results.
//!
//! Structured tags (MusicBrainz first, then Last.fm) are unioned with a
//! case-insensitive, order-preserving dedup that keeps the first-seen casing.
//! The generative result only contributes when that union is empty.

use crate::providers::{
    GenerativeResult, ListenerStatsResult, MusicBrainzResult, ProviderKind,
};
use core_library::TrackRef;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered genre list deduplicated on the lowercased name.
#[derive(Debug, Clone, Default)]
pub struct GenreSet {
    seen: HashSet<String>,
    entries: Vec<(String, ProviderKind)>,
}

impl GenreSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `tag` unless an equal tag (ignoring case) is present.
    /// Returns whether it was added.
    pub fn insert(&mut self, tag: &str, source: ProviderKind) -> bool {
        let tag = tag.trim();
        if tag.is_empty() {
            return false;
        }
        if !self.seen.insert(tag.to_lowercase()) {
            return false;
        }
        self.entries.push((tag.to_string(), source));
        true
    }

    pub fn extend<'a>(&mut self, tags: impl IntoIterator<Item = &'a String>, source: ProviderKind) {
        for tag in tags {
            self.insert(tag, source);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Providers that contributed at least one surviving tag, in priority order.
    pub fn sources(&self) -> Vec<ProviderKind> {
        let mut sources: Vec<ProviderKind> = self.entries.iter().map(|(_, s)| *s).collect();
        sources.sort();
        sources.dedup();
        sources
    }

    pub fn into_genres(self) -> Vec<String> {
        self.entries.into_iter().map(|(tag, _)| tag).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedFields {
    pub genres: Vec<String>,
    pub genre_sources: Vec<ProviderKind>,
    pub best_duration_ms: u64,
    pub used_fallback: bool,
}

/// One track with everything the providers said about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub track: TrackRef,
    pub musicbrainz: Option<MusicBrainzResult>,
    pub listener_stats: Option<ListenerStatsResult>,
    pub generative: Option<GenerativeResult>,
    pub merged: MergedFields,
}

/// Union of the structured providers' tags.
pub fn structured_genres(
    musicbrainz: Option<&MusicBrainzResult>,
    listener_stats: Option<&ListenerStatsResult>,
) -> GenreSet {
    let mut genres = GenreSet::new();
    if let Some(mb) = musicbrainz {
        genres.extend(&mb.tags, ProviderKind::MusicBrainz);
    }
    if let Some(ls) = listener_stats {
        genres.extend(&ls.tags, ProviderKind::ListenerStats);
    }
    genres
}

/// Whether a track qualifies for the generative fallback.
pub fn needs_fallback(
    musicbrainz: Option<&MusicBrainzResult>,
    listener_stats: Option<&ListenerStatsResult>,
) -> bool {
    structured_genres(musicbrainz, listener_stats).is_empty()
}

/// MusicBrainz length, then Last.fm duration, then the catalog's own.
pub fn best_duration_ms(
    track: &TrackRef,
    musicbrainz: Option<&MusicBrainzResult>,
    listener_stats: Option<&ListenerStatsResult>,
) -> u64 {
    musicbrainz
        .and_then(|mb| mb.length_ms)
        .filter(|&ms| ms > 0)
        .or_else(|| listener_stats.and_then(ListenerStatsResult::parsed_duration_ms))
        .unwrap_or(track.duration_ms)
}

pub fn merge_record(
    track: TrackRef,
    musicbrainz: Option<MusicBrainzResult>,
    listener_stats: Option<ListenerStatsResult>,
    generative: Option<GenerativeResult>,
) -> MergedRecord {
    let mut genres = structured_genres(musicbrainz.as_ref(), listener_stats.as_ref());
    let mut used_fallback = false;

    if genres.is_empty() {
        if let Some(ai) = &generative {
            if let Some(primary) = &ai.primary_genre {
                genres.insert(primary, ProviderKind::Generative);
                used_fallback = true;
            }
            genres.extend(&ai.subgenres, ProviderKind::Generative);
        }
    }

    let merged = MergedFields {
        genre_sources: genres.sources(),
        best_duration_ms: best_duration_ms(&track, musicbrainz.as_ref(), listener_stats.as_ref()),
        genres: genres.into_genres(),
        used_fallback,
    };

    MergedRecord {
        track,
        musicbrainz,
        listener_stats,
        generative,
        merged,
    }
}
