//! Bounded-concurrency fan-out for per-record remote lookups.

use anyquery_error::Result;
use futures::future::try_join_all;
use std::future::Future;

pub use anyquery_common::config::DEFAULT_BATCH_SIZE;

/// Apply `f` to every item, at most `batch_size` at a time.
///
/// Items are split into consecutive batches; a batch is driven to completion
/// before the next one starts. Results come back in input order. The first
/// failure aborts the whole fan-out.
pub async fn map_concurrently<T, R, F, Fut>(
    items: Vec<T>,
    batch_size: usize,
    f: F,
) -> Result<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let batch_size = batch_size.max(1);
    let total = items.len();
    let mut results = Vec::with_capacity(total);
    let mut pending = items.into_iter().peekable();
    let mut batch_no = 0usize;

    while pending.peek().is_some() {
        let batch: Vec<Fut> = pending.by_ref().take(batch_size).map(&f).collect();
        tracing::debug!(
            "Fan-out batch {} with {} lookups ({} total)",
            batch_no,
            batch.len(),
            total
        );
        results.extend(try_join_all(batch).await?);
        batch_no += 1;
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyquery_error::{ErrorCode, QueryError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_bounded_and_ordered() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));

        let items: Vec<usize> = (0..120).collect();
        let results = map_concurrently(items, 50, |i| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                // Later items finish first to prove ordering does not follow completion.
                tokio::time::sleep(Duration::from_millis(20 + (120 - i as u64) % 7)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(i * 2)
            }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 120);
        assert_eq!(peak.load(Ordering::SeqCst), 50);
        assert_eq!(results, (0..120).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_zero_batch_size_runs_sequentially() {
        let peak = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let results = map_concurrently(vec![1, 2, 3], 0, |i| {
            let peak = peak.clone();
            let in_flight = in_flight.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(i)
            }
        })
        .await
        .unwrap();
        assert_eq!(results, vec![1, 2, 3]);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_failure_aborts() {
        let err = map_concurrently(vec![1, 2, 3], 2, |i| async move {
            if i == 2 {
                Err(QueryError::new(ErrorCode::TransportFailed, "lookup failed"))
            } else {
                Ok(i)
            }
        })
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::TransportFailed);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let results: Vec<i32> = map_concurrently(Vec::<i32>::new(), 50, |i| async move { Ok(i) })
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
