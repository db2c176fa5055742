//! Memoization of generative lookups.
//!
//! Keys are the case-folded `(artist, title)` pair. Only successful results
//! are stored, and entries live until [`GenerativeCache::clear`].

use crate::providers::GenerativeResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    artist: String,
    title: String,
}

impl CacheKey {
    pub fn new(artist: &str, title: &str) -> Self {
        Self {
            artist: artist.to_lowercase(),
            title: title.to_lowercase(),
        }
    }
}

/// Renders `artist-title` for display only. The rendering is ambiguous when
/// either part contains `-` (`("a-b", "c")` and `("a", "b-c")` print alike);
/// lookups compare the fields, so such keys stay distinct entries.
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.artist, self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entry_count: usize,
    /// Keys rendered as `artist-title`, sorted. Two distinct entries can
    /// render to the same string when a part contains `-`.
    pub keys: Vec<String>,
}

#[derive(Debug, Default)]
pub struct GenerativeCache {
    entries: RwLock<HashMap<CacheKey, GenerativeResult>>,
}

impl GenerativeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<GenerativeResult> {
        // A poisoned lock only means a writer panicked mid-insert; the map is
        // still a valid HashMap.
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, result: GenerativeResult) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        debug!(key = %key, "Caching generative result");
        entries.insert(key, result);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = entries.keys().map(ToString::to_string).collect();
        keys.sort();
        CacheStats {
            entry_count: entries.len(),
            keys,
        }
    }

    /// Empties the cache and returns how many entries were dropped.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let removed = entries.len();
        entries.clear();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(genre: &str) -> GenerativeResult {
        GenerativeResult {
            primary_genre: Some(genre.to_string()),
            subgenres: vec![],
            confidence: 0.8,
            era: None,
            characteristics: None,
            related_artists: vec![],
            tokens_used: 42,
        }
    }

    #[test]
    fn test_key_is_case_insensitive() {
        let cache = GenerativeCache::new();
        cache.insert(CacheKey::new("Phoebe Bridgers", "Motion Sickness"), result("indie rock"));

        let hit = cache.get(&CacheKey::new("PHOEBE BRIDGERS", "motion sickness"));
        assert_eq!(hit.and_then(|r| r.primary_genre).as_deref(), Some("indie rock"));
    }

    #[test]
    fn test_stats_and_clear() {
        let cache = GenerativeCache::new();
        cache.insert(CacheKey::new("B Artist", "Song"), result("pop"));
        cache.insert(CacheKey::new("A Artist", "Song"), result("rock"));

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.keys, vec!["a artist-song", "b artist-song"]);

        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.clear(), 0);
    }

    #[test]
    fn test_insert_overwrites() {
        let cache = GenerativeCache::new();
        let key = CacheKey::new("a", "b");
        cache.insert(key.clone(), result("pop"));
        cache.insert(key.clone(), result("rock"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key).and_then(|r| r.primary_genre).as_deref(), Some("rock"));
    }

    #[test]
    fn test_hyphenated_keys_stay_distinct() {
        let cache = GenerativeCache::new();
        cache.insert(CacheKey::new("a-b", "c"), result("pop"));
        cache.insert(CacheKey::new("a", "b-c"), result("rock"));

        assert_eq!(cache.len(), 2);
        assert_eq!(
            cache.get(&CacheKey::new("a-b", "c")).and_then(|r| r.primary_genre).as_deref(),
            Some("pop")
        );
        assert_eq!(cache.stats().keys, vec!["a-b-c", "a-b-c"]);
    }
}
