//! # Event Bus System
//!
//! Typed progress events for catalog retrieval and enrichment runs, published
//! over `tokio::sync::broadcast`.
//!
//! The bus is the core's observability hook: the paginator and the enrichment
//! service report what they are doing here instead of writing to stdout. A
//! host that wants a progress bar subscribes; a host that does not care never
//! subscribes and emission silently goes nowhere.
//!
//! ```text
//! ┌───────────────────┐  emit  ┌───────────┐  subscribe  ┌────────────┐
//! │ CatalogPaginator  ├───────>│           ├────────────>│ Subscriber │
//! └───────────────────┘        │ EventBus  │             └────────────┘
//! ┌───────────────────┐  emit  │           │  subscribe  ┌────────────┐
//! │ EnrichmentService ├───────>│           ├────────────>│ Subscriber │
//! └───────────────────┘        └───────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
//!
//! let event_bus = EventBus::new(100);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Catalog(CatalogEvent::Completed { total_items: 120, pages: 3 }))
//!     .ok();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall further behind receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Catalog(CatalogEvent),
    Enrichment(EnrichmentEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Catalog(e) => e.description(),
            CoreEvent::Enrichment(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Catalog(CatalogEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Catalog(CatalogEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Enrichment(EnrichmentEvent::Started { .. }) => EventSeverity::Info,
            CoreEvent::Enrichment(EnrichmentEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Catalog Events
// ============================================================================

/// Events emitted while walking the paginated track listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CatalogEvent {
    /// One page was fetched and parsed.
    PageFetched {
        /// 1-based page number.
        page: u32,
        /// Tracks collected so far, this page included.
        items_so_far: u64,
    },
    /// The listing was walked to the end.
    Completed { total_items: u64, pages: u32 },
    /// A page could not be fetched; the run is aborted.
    Failed { message: String },
}

impl CatalogEvent {
    fn description(&self) -> &str {
        match self {
            CatalogEvent::PageFetched { .. } => "Catalog page fetched",
            CatalogEvent::Completed { .. } => "Catalog retrieval completed",
            CatalogEvent::Failed { .. } => "Catalog retrieval failed",
        }
    }
}

// ============================================================================
// Enrichment Events
// ============================================================================

/// Events emitted during an enrichment run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum EnrichmentEvent {
    Started {
        run_id: String,
        /// Mode name, e.g. `hybrid`.
        mode: String,
        total_tracks: u64,
    },
    /// A batch of structured lookups finished.
    BatchCompleted {
        run_id: String,
        /// 1-based batch number.
        batch: u32,
        total_batches: u32,
        /// Tracks processed so far.
        processed: u64,
    },
    /// Generative fallback begins for tracks without structured tags.
    FallbackStarted { run_id: String, tracks: u64 },
    Completed {
        run_id: String,
        total_tracks: u64,
        with_musicbrainz: u64,
        with_listener_stats: u64,
        enhanced_with_ai: u64,
        duration_ms: u64,
    },
    /// The generative memoization cache was cleared.
    CacheCleared { entries_removed: u64 },
}

impl EnrichmentEvent {
    fn description(&self) -> &str {
        match self {
            EnrichmentEvent::Started { .. } => "Enrichment started",
            EnrichmentEvent::BatchCompleted { .. } => "Enrichment batch completed",
            EnrichmentEvent::FallbackStarted { .. } => "Generative fallback started",
            EnrichmentEvent::Completed { .. } => "Enrichment completed",
            EnrichmentEvent::CacheCleared { .. } => "Generative cache cleared",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cloning the bus is cheap; every clone publishes into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none. Producers call `.ok()` on the result.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let enrichment_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Enrichment(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once every sender is gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_event(batch: u32) -> CoreEvent {
        CoreEvent::Enrichment(EnrichmentEvent::BatchCompleted {
            run_id: "run-1".to_string(),
            batch,
            total_batches: 3,
            processed: batch as u64 * 5,
        })
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.emit(batch_event(1)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Catalog(CatalogEvent::PageFetched {
            page: 1,
            items_so_far: 50,
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_filter_skips_non_matching() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Enrichment(_)));

        bus.emit(CoreEvent::Catalog(CatalogEvent::Completed {
            total_items: 7,
            pages: 1,
        }))
        .ok();
        bus.emit(batch_event(2)).ok();

        assert_eq!(stream.recv().await.unwrap(), batch_event(2));
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut stream = EventStream::new(bus.subscribe());

        for batch in 1..=4 {
            bus.emit(batch_event(batch)).ok();
        }

        assert!(matches!(stream.try_recv(), Some(Err(RecvError::Lagged(_)))));
    }

    #[test]
    fn test_severity_and_description() {
        let failed = CoreEvent::Catalog(CatalogEvent::Failed {
            message: "HTTP 500".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);
        assert_eq!(failed.description(), "Catalog retrieval failed");

        assert_eq!(batch_event(1).severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = CoreEvent::Enrichment(EnrichmentEvent::CacheCleared { entries_removed: 4 });
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "Enrichment");
        assert_eq!(json["payload"]["event"], "CacheCleared");
        assert_eq!(json["payload"]["entries_removed"], 4);
    }
}
