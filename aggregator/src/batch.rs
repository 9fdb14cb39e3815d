//! Batched concurrent execution with pacing between batches.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use tracing::debug;

/// Run `worker` over `items` in concurrent batches of `batch_size`, pausing
/// `inter_batch_delay` between batches.
///
/// Results come back in input order regardless of completion order. No delay
/// follows the final batch. A `batch_size` of zero is treated as one item
/// per batch.
pub async fn run_batched<I, T, F, Fut>(
    items: Vec<I>,
    batch_size: usize,
    inter_batch_delay: Duration,
    worker: F,
) -> Vec<T>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = T>,
{
    let batch_size = batch_size.max(1);
    let mut results = Vec::with_capacity(items.len());
    let mut queue = items;
    let mut batch_index = 0usize;

    while !queue.is_empty() {
        let rest = queue.split_off(batch_size.min(queue.len()));
        let batch = std::mem::replace(&mut queue, rest);
        batch_index += 1;

        debug!(
            "Running batch {} ({} items, {} queued)",
            batch_index,
            batch.len(),
            queue.len()
        );
        results.extend(join_all(batch.into_iter().map(&worker)).await);

        if !queue.is_empty() && !inter_batch_delay.is_zero() {
            tokio::time::sleep(inter_batch_delay).await;
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_results_keep_input_order() {
        // Workers finish in reverse order; output order must not change
        let results = run_batched(vec![3u64, 1, 2], 3, Duration::ZERO, |n| async move {
            tokio::time::sleep(Duration::from_secs(n)).await;
            n * 10
        })
        .await;

        assert_eq!(results, vec![30, 10, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_applies_between_batches_only() {
        let started = Instant::now();
        let results = run_batched(
            (0..5).collect::<Vec<u32>>(),
            2,
            Duration::from_millis(100),
            |n| async move { n },
        )
        .await;

        assert_eq!(results.len(), 5);
        // Three batches, so two pauses and none after the last
        assert_eq!(started.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_within_a_batch_run_concurrently() {
        let started = Instant::now();
        run_batched(vec![(), ()], 2, Duration::ZERO, |_| async {
            tokio::time::sleep(Duration::from_secs(1)).await;
        })
        .await;

        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_zero_batch_size_still_makes_progress() {
        let results = run_batched(vec![1, 2, 3], 0, Duration::ZERO, |n| async move { n }).await;
        assert_eq!(results, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_output() {
        let results: Vec<i32> =
            run_batched(Vec::new(), 3, Duration::from_millis(100), |n: i32| async move { n })
                .await;
        assert!(results.is_empty());
    }
}
