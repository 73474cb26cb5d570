use std::future::Future;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};

/// Chunking policy for enrichment lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    /// Items in flight at once; 0 is treated as 1
    pub concurrency: usize,
    /// Pause between consecutive chunks
    pub delay: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            concurrency: 3,
            delay: Duration::from_millis(100),
        }
    }
}

/// Runs `op` over `items` in sequential chunks of `settings.concurrency`.
///
/// Operations inside a chunk are polled concurrently and the chunk settles completely before the
/// next one starts. Results are appended in settle order. A failed item is replaced by
/// `on_failure(item, error)`, so the output always has one entry per input.
pub async fn run_batched<I, R, E, F, Fut, G>(
    items: Vec<I>,
    settings: &BatchSettings,
    op: F,
    on_failure: G,
) -> Vec<R>
where
    I: Clone,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    G: Fn(&I, &E) -> R,
{
    let chunk_size = settings.concurrency.max(1);
    let mut results = Vec::with_capacity(items.len());
    let mut chunks = items.chunks(chunk_size).enumerate().peekable();

    while let Some((index, chunk)) = chunks.next() {
        tracing::debug!(chunk = index, size = chunk.len(), "Running batch chunk");

        let mut pending: FuturesUnordered<_> = chunk
            .iter()
            .cloned()
            .map(|item| {
                let op = &op;
                let on_failure = &on_failure;
                async move {
                    match op(item.clone()).await {
                        Ok(result) => result,
                        Err(e) => on_failure(&item, &e),
                    }
                }
            })
            .collect();

        while let Some(result) = pending.next().await {
            results.push(result);
        }

        if chunks.peek().is_some() && !settings.delay.is_zero() {
            tokio::time::sleep(settings.delay).await;
        }
    }

    results
}
