//! Order-preserving bounded batching.
//!
//! Items are split into consecutive chunks of `size`; every chunk runs
//! concurrently, the next chunk starts only after the whole chunk finished and
//! `delay` elapsed. No delay follows the last chunk.

use futures::future::join_all;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub size: usize,
    pub delay: Duration,
}

impl BatchPolicy {
    pub fn new(size: usize, delay_ms: u64) -> Self {
        Self {
            size: size.max(1),
            delay: Duration::from_millis(delay_ms),
        }
    }

    /// One item at a time with no extra delay; pacing is left to the
    /// provider's own limiter.
    pub fn sequential() -> Self {
        Self::new(1, 0)
    }

    pub fn batch_count(&self, items: usize) -> usize {
        items.div_ceil(self.size.max(1))
    }
}

/// Reported after every finished batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// 1-based.
    pub batch: u32,
    pub total_batches: u32,
    pub processed: u64,
}

/// Runs `task` over `items` under `policy` and returns outputs in input order.
pub async fn run_batched<I, R, F, Fut, P>(
    items: Vec<I>,
    policy: BatchPolicy,
    mut on_batch: P,
    task: F,
) -> Vec<R>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = R>,
    P: FnMut(BatchProgress),
{
    let size = policy.size.max(1);
    let total_batches = policy.batch_count(items.len()) as u32;
    let mut results = Vec::with_capacity(items.len());
    let mut pending = items.into_iter().peekable();
    let mut batch = 0u32;

    while pending.peek().is_some() {
        let chunk: Vec<I> = pending.by_ref().take(size).collect();
        batch += 1;

        debug!(batch, total_batches, size = chunk.len(), "Running batch");
        results.extend(join_all(chunk.into_iter().map(&task)).await);

        on_batch(BatchProgress {
            batch,
            total_batches,
            processed: results.len() as u64,
        });

        if pending.peek().is_some() && !policy.delay.is_zero() {
            sleep(policy.delay).await;
        }
    }

    results
}
