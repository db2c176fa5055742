//! # Enrichment Service
//!
//! Runs one enrichment pass over a track list: structured lookups, generative
//! fallback for tracks still without genres, merge, then aggregation.
//!
//! ## Overview
//!
//! Every mode drives the same pipeline; a mode only decides which providers
//! take part and how they are scheduled ([`EnrichmentPlan`]):
//!
//! | Mode | Structured | Fallback | Scheduling |
//! |------|------------|----------|------------|
//! | `listener-only` | Last.fm | - | batched |
//! | `musicbrainz-only` | MusicBrainz | - | sequential |
//! | `hybrid` | MusicBrainz, Last.fm | - | batched |
//! | `ai-enhanced` | MusicBrainz, Last.fm | generative | batched |
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────┐
//! │ EnrichmentService  │
//! └──────────┬─────────┘
//!            │  per batch, per track (concurrently)
//!            ├──> MusicBrainz   (own 1s limiter)
//!            ├──> Last.fm
//!            │  tracks with no structured tags
//!            ├──> Generative    (cache, then 100ms limiter)
//!            ├──> merge_record
//!            └──> AggregateStats
//! ```
//!
//! MusicBrainz and Last.fm lookups for a track are joined, not chained, so
//! MusicBrainz's limiter never holds back Last.fm.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::{EnrichmentMode, EnrichmentService};
//!
//! let service = EnrichmentService::new(scheduling)
//!     .with_musicbrainz(musicbrainz)
//!     .with_listener_stats(lastfm)
//!     .with_generative(generative)
//!     .with_event_bus(event_bus);
//!
//! let report = service.enrich(tracks, EnrichmentMode::AiEnhanced).await?;
//! println!("{} genres", report.stats.total_unique_genres);
//! ```

use crate::error::{MetadataError, Result};
use crate::merge::{merge_record, needs_fallback, MergedRecord};
use crate::providers::{
    GenerativeResult, ListenerStatsResult, LookupQuery, MetadataProvider, MusicBrainzResult,
    ProviderKind, ProviderResult,
};
use crate::scheduler::{run_batched, BatchPolicy};
use crate::stats::AggregateStats;
use core_library::TrackRef;
use core_runtime::config::SchedulingConfig;
use core_runtime::events::{CoreEvent, EnrichmentEvent, EventBus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, instrument};
use uuid::Uuid;

// =============================================================================
// Modes and plans
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnrichmentMode {
    ListenerOnly,
    #[serde(rename = "musicbrainz-only")]
    MusicBrainzOnly,
    Hybrid,
    AiEnhanced,
}

impl EnrichmentMode {
    pub const ALL: [EnrichmentMode; 4] = [
        EnrichmentMode::ListenerOnly,
        EnrichmentMode::MusicBrainzOnly,
        EnrichmentMode::Hybrid,
        EnrichmentMode::AiEnhanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentMode::ListenerOnly => "listener-only",
            EnrichmentMode::MusicBrainzOnly => "musicbrainz-only",
            EnrichmentMode::Hybrid => "hybrid",
            EnrichmentMode::AiEnhanced => "ai-enhanced",
        }
    }
}

impl fmt::Display for EnrichmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrichmentMode {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| MetadataError::InvalidMode(s.to_string()))
    }
}

/// Which providers a run uses and how structured lookups are scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentPlan {
    /// Structured providers, highest priority first.
    pub structured: Vec<ProviderKind>,
    pub fallback: Option<ProviderKind>,
    /// `None` runs one track at a time.
    pub batch: Option<BatchPolicy>,
}

impl EnrichmentPlan {
    pub fn for_mode(mode: EnrichmentMode, scheduling: &SchedulingConfig) -> Self {
        let batched = Some(BatchPolicy::new(
            scheduling.batch_size,
            scheduling.batch_delay_ms,
        ));

        match mode {
            EnrichmentMode::ListenerOnly => Self {
                structured: vec![ProviderKind::ListenerStats],
                fallback: None,
                batch: batched,
            },
            EnrichmentMode::MusicBrainzOnly => Self {
                structured: vec![ProviderKind::MusicBrainz],
                fallback: None,
                batch: None,
            },
            EnrichmentMode::Hybrid => Self {
                structured: vec![ProviderKind::MusicBrainz, ProviderKind::ListenerStats],
                fallback: None,
                batch: batched,
            },
            EnrichmentMode::AiEnhanced => Self {
                structured: vec![ProviderKind::MusicBrainz, ProviderKind::ListenerStats],
                fallback: Some(ProviderKind::Generative),
                batch: batched,
            },
        }
    }

    pub fn uses(&self, kind: ProviderKind) -> bool {
        self.structured.contains(&kind) || self.fallback == Some(kind)
    }

    pub fn providers(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.structured.iter().copied().chain(self.fallback)
    }
}

// =============================================================================
// Report
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentReport {
    pub run_id: String,
    pub mode: EnrichmentMode,
    /// One record per input track, in input order.
    pub records: Vec<MergedRecord>,
    pub stats: AggregateStats,
    pub duration_ms: u64,
}

type StructuredOutcome = (Option<MusicBrainzResult>, Option<ListenerStatsResult>);

// =============================================================================
// Enrichment Service
// =============================================================================

#[derive(Clone)]
pub struct EnrichmentService {
    musicbrainz: Option<Arc<dyn MetadataProvider>>,
    listener_stats: Option<Arc<dyn MetadataProvider>>,
    generative: Option<Arc<dyn MetadataProvider>>,
    scheduling: SchedulingConfig,
    event_bus: Option<EventBus>,
}

impl EnrichmentService {
    pub fn new(scheduling: SchedulingConfig) -> Self {
        Self {
            musicbrainz: None,
            listener_stats: None,
            generative: None,
            scheduling,
            event_bus: None,
        }
    }

    pub fn with_musicbrainz(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.musicbrainz = Some(provider);
        self
    }

    pub fn with_listener_stats(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.listener_stats = Some(provider);
        self
    }

    pub fn with_generative(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.generative = Some(provider);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    fn provider(&self, kind: ProviderKind) -> Option<&Arc<dyn MetadataProvider>> {
        match kind {
            ProviderKind::MusicBrainz => self.musicbrainz.as_ref(),
            ProviderKind::ListenerStats => self.listener_stats.as_ref(),
            ProviderKind::Generative => self.generative.as_ref(),
        }
    }

    /// Resolves `mode`, failing if any provider it needs is missing.
    pub fn plan(&self, mode: EnrichmentMode) -> Result<EnrichmentPlan> {
        let plan = EnrichmentPlan::for_mode(mode, &self.scheduling);
        if let Some(missing) = plan.providers().find(|kind| self.provider(*kind).is_none()) {
            return Err(MetadataError::ProviderNotConfigured(missing.as_str()));
        }
        Ok(plan)
    }

    fn emit(&self, event: EnrichmentEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Enrichment(event)).ok();
        }
    }

    /// Enriches `tracks` and returns one record per track, in order.
    ///
    /// Provider failures only lower coverage; the only error is a mode whose
    /// providers are not configured, reported before any request is made.
    #[instrument(skip(self, tracks), fields(mode = %mode, tracks = tracks.len()))]
    pub async fn enrich(&self, tracks: Vec<TrackRef>, mode: EnrichmentMode) -> Result<EnrichmentReport> {
        let plan = self.plan(mode)?;
        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        info!(run_id = %run_id, "Starting enrichment");
        self.emit(EnrichmentEvent::Started {
            run_id: run_id.clone(),
            mode: mode.to_string(),
            total_tracks: tracks.len() as u64,
        });

        let queries: Vec<LookupQuery> = tracks.iter().map(LookupQuery::from).collect();
        let structured = self.run_structured(&run_id, &plan, &queries).await;

        let mut generative: Vec<Option<GenerativeResult>> = vec![None; tracks.len()];
        if plan.fallback.is_some() {
            let pending: Vec<usize> = structured
                .iter()
                .enumerate()
                .filter(|(_, (mb, ls))| needs_fallback(mb.as_ref(), ls.as_ref()))
                .map(|(index, _)| index)
                .collect();

            if !pending.is_empty() {
                info!(run_id = %run_id, tracks = pending.len(), "Starting generative fallback");
                self.emit(EnrichmentEvent::FallbackStarted {
                    run_id: run_id.clone(),
                    tracks: pending.len() as u64,
                });

                let results = self.run_fallback(&pending, &queries).await;
                for (index, result) in pending.into_iter().zip(results) {
                    generative[index] = result;
                }
            }
        }

        let records: Vec<MergedRecord> = tracks
            .into_iter()
            .zip(structured)
            .zip(generative)
            .map(|((track, (mb, ls)), ai)| merge_record(track, mb, ls, ai))
            .collect();

        let stats = AggregateStats::from_records(&records);
        let duration_ms = started.elapsed().as_millis() as u64;

        info!(
            run_id = %run_id,
            total = stats.total_songs,
            with_musicbrainz = stats.songs_with_musicbrainz,
            with_listener_stats = stats.songs_with_listener_stats,
            enhanced_with_ai = stats.songs_enhanced_with_ai,
            duration_ms,
            "Enrichment completed"
        );
        self.emit(EnrichmentEvent::Completed {
            run_id: run_id.clone(),
            total_tracks: stats.total_songs,
            with_musicbrainz: stats.songs_with_musicbrainz,
            with_listener_stats: stats.songs_with_listener_stats,
            enhanced_with_ai: stats.songs_enhanced_with_ai,
            duration_ms,
        });

        Ok(EnrichmentReport {
            run_id,
            mode,
            records,
            stats,
            duration_ms,
        })
    }

    async fn run_structured(
        &self,
        run_id: &str,
        plan: &EnrichmentPlan,
        queries: &[LookupQuery],
    ) -> Vec<StructuredOutcome> {
        let musicbrainz = self
            .musicbrainz
            .as_ref()
            .filter(|_| plan.structured.contains(&ProviderKind::MusicBrainz));
        let listener_stats = self
            .listener_stats
            .as_ref()
            .filter(|_| plan.structured.contains(&ProviderKind::ListenerStats));

        let policy = plan.batch.unwrap_or_else(BatchPolicy::sequential);
        debug!(batch_size = policy.size, delay_ms = policy.delay.as_millis() as u64, "Structured lookups");

        run_batched(
            queries.iter().collect(),
            policy,
            |progress| {
                self.emit(EnrichmentEvent::BatchCompleted {
                    run_id: run_id.to_string(),
                    batch: progress.batch,
                    total_batches: progress.total_batches,
                    processed: progress.processed,
                })
            },
            |query| async move {
                let mb = async {
                    match musicbrainz {
                        Some(provider) => provider
                            .lookup(query)
                            .await
                            .and_then(ProviderResult::into_musicbrainz),
                        None => None,
                    }
                };
                let ls = async {
                    match listener_stats {
                        Some(provider) => provider
                            .lookup(query)
                            .await
                            .and_then(ProviderResult::into_listener_stats),
                        None => None,
                    }
                };
                futures::join!(mb, ls)
            },
        )
        .await
    }

    async fn run_fallback(
        &self,
        pending: &[usize],
        queries: &[LookupQuery],
    ) -> Vec<Option<GenerativeResult>> {
        let Some(generative) = self.generative.as_ref() else {
            return vec![None; pending.len()];
        };

        let policy = BatchPolicy::new(
            self.scheduling.generative_batch_size,
            self.scheduling.generative_batch_delay_ms,
        );

        run_batched(
            pending.iter().map(|&index| &queries[index]).collect(),
            policy,
            |progress| debug!(batch = progress.batch, total = progress.total_batches, "Generative batch done"),
            |query| async move {
                generative
                    .lookup(query)
                    .await
                    .and_then(ProviderResult::into_generative)
            },
        )
        .await
    }
}
