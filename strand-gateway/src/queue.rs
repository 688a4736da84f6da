use std::time::Duration;

use leaky_bucket_lite::LeakyBucket;

/// Grants identify slots at most once per rolling window.
///
/// The remote caps how often a fresh session may be started across the
/// whole application, independent of the per-route request buckets. One
/// queue is shared by every shard of a cluster; resumes bypass it.
pub(crate) struct IdentifyQueue {
    bucket: LeakyBucket,
}

impl IdentifyQueue {
    pub fn new(window: Duration) -> Self {
        let bucket = LeakyBucket::builder()
            .max(1)
            .tokens(1)
            .refill_interval(window)
            .refill_amount(1)
            .build();

        Self { bucket }
    }

    pub async fn acquire(&self) {
        self.bucket.acquire_one().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::IdentifyQueue;

    #[tokio::test(start_paused = true)]
    async fn slots_are_spaced_by_the_window() {
        let window = Duration::from_secs(5);
        let queue = IdentifyQueue::new(window);

        let start = Instant::now();
        queue.acquire().await;
        assert_eq!(Instant::now(), start);

        queue.acquire().await;
        assert!(Instant::now() >= start + window);

        queue.acquire().await;
        assert!(Instant::now() >= start + 2 * window);
    }
}
