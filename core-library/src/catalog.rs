//! Catalog retrieval
//!
//! A [`CatalogSource`] fetches one page of the user's saved tracks. The
//! [`CatalogPaginator`] follows the opaque `next` cursor until the listing is
//! exhausted, using a loop so a library of hundreds of pages costs no stack.
//!
//! Any page failure aborts the walk. A truncated track list would make every
//! downstream statistic silently wrong, so nothing partial is ever returned.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use tracing::{debug, info, instrument, warn};

use crate::error::{LibraryError, Result};
use crate::models::TrackRef;

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    pub items: Vec<TrackRef>,
    /// Cursor for the following page, `None` on the last page.
    pub next: Option<String>,
}

/// A paginated track listing.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Short name used in logs, e.g. `spotify`.
    fn name(&self) -> &'static str;

    /// Fetch the page identified by `cursor`.
    ///
    /// The first call receives the starting listing reference; later calls
    /// receive whatever the previous page returned as `next`.
    async fn list_page(&self, cursor: &str, bearer_token: &str) -> Result<CatalogPage>;
}

/// Walks a [`CatalogSource`] to completion.
pub struct CatalogPaginator {
    source: Arc<dyn CatalogSource>,
    event_bus: Option<EventBus>,
}

impl CatalogPaginator {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            event_bus: None,
        }
    }

    /// Report page progress on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Fetch every track reachable from `start`, in listing order.
    ///
    /// # Errors
    ///
    /// - [`LibraryError::Catalog`] when any page fails
    /// - [`LibraryError::CursorCycle`] when a `next` cursor repeats
    #[instrument(skip(self, bearer_token), fields(source = self.source.name()))]
    pub async fn fetch_all(&self, start: &str, bearer_token: &str) -> Result<Vec<TrackRef>> {
        let mut tracks = Vec::new();
        let mut visited = HashSet::new();
        let mut cursor = Some(start.to_string());
        let mut page: u32 = 0;

        while let Some(current) = cursor.take() {
            page += 1;

            if !visited.insert(current.clone()) {
                warn!(page, cursor = %current, "Catalog cursor repeats, aborting");
                let error = LibraryError::CursorCycle {
                    page,
                    cursor: current,
                };
                self.emit_failure(&error);
                return Err(error);
            }

            debug!(page, cursor = %current, "Fetching catalog page");

            let listing = match self.source.list_page(&current, bearer_token).await {
                Ok(listing) => listing,
                Err(err) => {
                    warn!(page, error = %err, "Catalog page fetch failed");
                    let error = match err {
                        LibraryError::Catalog { .. } | LibraryError::CursorCycle { .. } => err,
                        other => LibraryError::Catalog {
                            page,
                            message: other.to_string(),
                        },
                    };
                    self.emit_failure(&error);
                    return Err(error);
                }
            };

            tracks.extend(listing.items);
            self.emit(CatalogEvent::PageFetched {
                page,
                items_so_far: tracks.len() as u64,
            });

            cursor = listing.next;
        }

        info!(pages = page, total = tracks.len(), "Catalog retrieval complete");
        self.emit(CatalogEvent::Completed {
            total_items: tracks.len() as u64,
            pages: page,
        });

        Ok(tracks)
    }

    fn emit(&self, event: CatalogEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Catalog(event)).ok();
        }
    }

    fn emit_failure(&self, error: &LibraryError) {
        self.emit(CatalogEvent::Failed {
            message: error.to_string(),
        });
    }
}
