//! Run-level aggregates over merged records.

use crate::merge::MergedRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How many entries [`AggregateStats::top_genres`] keeps.
pub const TOP_GENRES_LIMIT: usize = 10;

// =============================================================================
// Genre categories
// =============================================================================

/// Coarse bucket a record is grouped under for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GenreCategory {
    Pop,
    Indie,
    HyperPop,
    #[serde(rename = "Hip-Hop")]
    HipHop,
    #[serde(rename = "R&B")]
    RnB,
    Rock,
    Electronic,
    Folk,
    Country,
    Jazz,
    Blues,
    Latin,
    Alternative,
    Other,
}

impl GenreCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenreCategory::Pop => "Pop",
            GenreCategory::Indie => "Indie",
            GenreCategory::HyperPop => "HyperPop",
            GenreCategory::HipHop => "Hip-Hop",
            GenreCategory::RnB => "R&B",
            GenreCategory::Rock => "Rock",
            GenreCategory::Electronic => "Electronic",
            GenreCategory::Folk => "Folk",
            GenreCategory::Country => "Country",
            GenreCategory::Jazz => "Jazz",
            GenreCategory::Blues => "Blues",
            GenreCategory::Latin => "Latin",
            GenreCategory::Alternative => "Alternative",
            GenreCategory::Other => "Other",
        }
    }

    /// Exact (case-insensitive) lookup of a single tag.
    pub fn for_tag(tag: &str) -> Option<Self> {
        let category = match tag.trim().to_lowercase().as_str() {
            "pop" | "dance pop" | "electropop" | "synthpop" => GenreCategory::Pop,
            "indie pop" | "indie" => GenreCategory::Indie,
            "hyperpop" | "glitch pop" => GenreCategory::HyperPop,
            "hip hop" | "hip-hop" | "rap" | "trap" | "gangsta rap" => GenreCategory::HipHop,
            "rnb" | "r&b" | "soul" | "neo soul" | "contemporary r&b" => GenreCategory::RnB,
            "rock" | "alternative rock" | "indie rock" | "punk rock" | "hard rock"
            | "classic rock" => GenreCategory::Rock,
            "electronic" | "edm" | "house" | "techno" | "dubstep" | "ambient" => {
                GenreCategory::Electronic
            }
            "folk" | "americana" | "singer-songwriter" => GenreCategory::Folk,
            "country" => GenreCategory::Country,
            "jazz" | "swing" => GenreCategory::Jazz,
            "blues" => GenreCategory::Blues,
            "latin" | "reggaeton" | "salsa" => GenreCategory::Latin,
            "alternative" | "experimental" => GenreCategory::Alternative,
            _ => return None,
        };
        Some(category)
    }

    /// Category of the first genre that maps to one, else [`Other`](Self::Other).
    pub fn for_genres<S: AsRef<str>>(genres: &[S]) -> Self {
        genres
            .iter()
            .find_map(|g| Self::for_tag(g.as_ref()))
            .unwrap_or(GenreCategory::Other)
    }
}

impl fmt::Display for GenreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Aggregates
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreGroupStats {
    pub category: GenreCategory,
    pub count: u64,
    pub average_popularity: u64,
    pub average_listeners: u64,
    pub average_plays: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_songs: u64,
    pub songs_with_musicbrainz: u64,
    pub songs_with_listener_stats: u64,
    /// Records with a generative result naming a primary genre.
    pub songs_with_ai: u64,
    /// Records whose genres came from the generative fallback.
    pub songs_enhanced_with_ai: u64,
    /// Distinct genres across all records, ignoring case.
    pub total_unique_genres: u64,
    /// Mean catalog popularity, missing values counted as 0, rounded.
    pub average_popularity: u64,
    /// Mean generative confidence over results with confidence above 0.
    pub average_ai_confidence: f64,
    pub total_tokens_used: u64,
    /// Most frequent genres, ties broken by first appearance.
    pub top_genres: Vec<GenreCount>,
    /// Per-category counts, largest first.
    pub genre_groups: Vec<GenreGroupStats>,
}

fn rounded_mean(sum: u64, count: u64) -> u64 {
    if count == 0 {
        0
    } else {
        (sum as f64 / count as f64).round() as u64
    }
}

#[derive(Default)]
struct GroupAccumulator {
    count: u64,
    popularity: u64,
    listeners: u64,
    plays: u64,
}

impl AggregateStats {
    pub fn from_records(records: &[MergedRecord]) -> Self {
        let total_songs = records.len() as u64;

        let songs_with_musicbrainz = records.iter().filter(|r| r.musicbrainz.is_some()).count() as u64;
        let songs_with_listener_stats = records.iter().filter(|r| r.listener_stats.is_some()).count() as u64;
        let songs_with_ai = records
            .iter()
            .filter(|r| r.generative.as_ref().is_some_and(|g| g.primary_genre.is_some()))
            .count() as u64;
        let songs_enhanced_with_ai = records.iter().filter(|r| r.merged.used_fallback).count() as u64;

        let popularity_sum: u64 = records
            .iter()
            .map(|r| r.track.popularity.unwrap_or(0) as u64)
            .sum();

        let confidences: Vec<f64> = records
            .iter()
            .filter_map(|r| r.generative.as_ref())
            .map(|g| g.confidence)
            .filter(|&c| c > 0.0)
            .collect();
        let average_ai_confidence = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f64>() / confidences.len() as f64
        };

        let total_tokens_used = records
            .iter()
            .filter_map(|r| r.generative.as_ref())
            .map(|g| g.tokens_used)
            .sum();

        // Lowercased genre -> (first-seen spelling, count, first position)
        let mut genre_counts: HashMap<String, (String, u64, usize)> = HashMap::new();
        for genre in records.iter().flat_map(|r| r.merged.genres.iter()) {
            let next_position = genre_counts.len();
            let entry = genre_counts
                .entry(genre.to_lowercase())
                .or_insert_with(|| (genre.clone(), 0, next_position));
            entry.1 += 1;
        }
        let total_unique_genres = genre_counts.len() as u64;

        let mut ranked: Vec<(String, u64, usize)> = genre_counts.into_values().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        let top_genres = ranked
            .into_iter()
            .take(TOP_GENRES_LIMIT)
            .map(|(genre, count, _)| GenreCount { genre, count })
            .collect();

        Self {
            total_songs,
            songs_with_musicbrainz,
            songs_with_listener_stats,
            songs_with_ai,
            songs_enhanced_with_ai,
            total_unique_genres,
            average_popularity: rounded_mean(popularity_sum, total_songs),
            average_ai_confidence,
            total_tokens_used,
            top_genres,
            genre_groups: genre_groups(records),
        }
    }
}

/// Buckets records by [`GenreCategory`] with per-bucket averages.
pub fn genre_groups(records: &[MergedRecord]) -> Vec<GenreGroupStats> {
    let mut groups: HashMap<GenreCategory, GroupAccumulator> = HashMap::new();

    for record in records {
        let category = GenreCategory::for_genres(record.merged.genres.as_slice());
        let group = groups.entry(category).or_default();
        group.count += 1;
        group.popularity += record.track.popularity.unwrap_or(0) as u64;
        if let Some(stats) = &record.listener_stats {
            group.listeners += stats.listener_count.unwrap_or(0);
            group.plays += stats.play_count.unwrap_or(0);
        }
    }

    let mut result: Vec<GenreGroupStats> = groups
        .into_iter()
        .map(|(category, acc)| GenreGroupStats {
            category,
            count: acc.count,
            average_popularity: rounded_mean(acc.popularity, acc.count),
            average_listeners: rounded_mean(acc.listeners, acc.count),
            average_plays: rounded_mean(acc.plays, acc.count),
        })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then(a.category.cmp(&b.category)));
    result
}
