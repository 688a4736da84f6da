//! Admission control for outbound requests.
//!
//! Quota state is authoritative from the remote: every response's headers
//! are written back into the bucket, success or not. Holding the bucket's
//! mutex from admission until that write-back gives strict FIFO per bucket
//! while leaving unrelated buckets untouched.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use http::HeaderMap;
use leaky_bucket_lite::LeakyBucket;
use parking_lot::Mutex as SyncMutex;
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    time::{sleep_until, Instant},
};

use crate::BucketKey;

const REMAINING: &str = "x-ratelimit-remaining";
const LIMIT: &str = "x-ratelimit-limit";
const RESET_AFTER: &str = "x-ratelimit-reset-after";
const BUCKET_ID: &str = "x-ratelimit-bucket";

/// Quota window of one route bucket, as last advertised by the remote.
#[derive(Debug, Default)]
pub struct Bucket {
    /// Calls left in the current window; `None` until first advertised.
    pub remaining: Option<u64>,
    pub limit: u64,
    pub reset_at: Option<Instant>,
    /// Identifier the remote assigned to this bucket.
    pub id: Option<Box<str>>,
}

pub struct Ratelimiter {
    buckets: DashMap<BucketKey, Arc<Mutex<Bucket>>>,
    /// Aggregate ceiling across all routes.
    global: LeakyBucket,
    /// Hard lockout set by a global 429; gates everything until it passes.
    global_until: SyncMutex<Option<Instant>>,
}

impl Ratelimiter {
    pub fn new(global_per_second: u32) -> Self {
        let per_second = global_per_second.max(1);

        let global = LeakyBucket::builder()
            .max(per_second)
            .tokens(per_second)
            .refill_interval(Duration::from_millis(1000 / u64::from(per_second)))
            .refill_amount(1)
            .build();

        Self {
            buckets: DashMap::new(),
            global,
            global_until: SyncMutex::new(None),
        }
    }

    /// Wait until a call on the given bucket may be transmitted.
    ///
    /// Callers on the same bucket are admitted first-in-first-out; the
    /// returned permit must be fed the response headers and only then
    /// dropped, so the next caller sees fresh quota state.
    pub async fn acquire(&self, key: &BucketKey) -> Permit {
        let bucket = Arc::clone(
            self.buckets
                .entry(key.clone())
                .or_default()
                .value(),
        );

        let mut guard = bucket.lock_owned().await;

        if let (Some(0), Some(reset_at)) = (guard.remaining, guard.reset_at) {
            let now = Instant::now();

            if reset_at > now {
                debug!(bucket = %key, wait = ?(reset_at - now), "Bucket exhausted, waiting for reset");
                sleep_until(reset_at).await;
            }

            // the window rolled over; state is re-learned from the response
            guard.remaining = None;
            guard.reset_at = None;
        }

        loop {
            let until = *self.global_until.lock();

            match until {
                Some(until) if until > Instant::now() => sleep_until(until).await,
                _ => break,
            }
        }

        self.global.acquire_one().await;

        Permit { guard }
    }

    /// Gate every route until `retry_after` from now has passed.
    pub fn lock_global(&self, retry_after: Duration) {
        let until = Instant::now() + retry_after;
        let mut guard = self.global_until.lock();

        if guard.map_or(true, |current| until > current) {
            warn!(?retry_after, "Globally ratelimited");
            *guard = Some(until);
        }
    }

    /// Number of buckets created so far.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Exclusive admission ticket for one bucket.
pub struct Permit {
    guard: OwnedMutexGuard<Bucket>,
}

impl Permit {
    /// Write the quota headers of a response back into the bucket.
    ///
    /// Applied unconditionally, error responses included.
    pub fn update(&mut self, headers: &HeaderMap) {
        if let Some(remaining) = header_parse::<u64>(headers, REMAINING) {
            self.guard.remaining = Some(remaining);
        }

        if let Some(limit) = header_parse::<u64>(headers, LIMIT) {
            self.guard.limit = limit;
        }

        if let Some(secs) = header_parse::<f64>(headers, RESET_AFTER) {
            self.guard.reset_at = Some(Instant::now() + Duration::from_secs_f64(secs));
        }

        if let Some(id) = headers.get(BUCKET_ID).and_then(|value| value.to_str().ok()) {
            if self.guard.id.as_deref() != Some(id) {
                self.guard.id = Some(Box::from(id));
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn set(&mut self, remaining: u64, reset_at: Instant) {
        self.guard.remaining = Some(remaining);
        self.guard.reset_at = Some(reset_at);
    }
}

fn header_parse<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)?
        .to_str()
        .ok()
        .and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::{HeaderMap, HeaderValue};
    use strand_model::id::Id;
    use tokio::time::Instant;

    use super::Ratelimiter;
    use crate::Route;

    fn key() -> crate::BucketKey {
        Route::CreateMessage {
            channel_id: Id::new(1),
        }
        .bucket_key()
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_bucket_admits_immediately() {
        let ratelimiter = Ratelimiter::new(50);
        let before = Instant::now();
        let _permit = ratelimiter.acquire(&key()).await;

        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_global_rate_is_lifted_to_one() {
        let ratelimiter = Ratelimiter::new(0);
        let before = Instant::now();
        let _permit = ratelimiter.acquire(&key()).await;

        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_bucket_waits_for_reset() {
        let ratelimiter = Ratelimiter::new(50);
        let reset_at = Instant::now() + Duration::from_secs(3);

        {
            let mut permit = ratelimiter.acquire(&key()).await;
            permit.set(0, reset_at);
        }

        let _permit = ratelimiter.acquire(&key()).await;

        assert!(Instant::now() >= reset_at);
    }

    #[tokio::test(start_paused = true)]
    async fn headers_refresh_the_bucket() {
        let ratelimiter = Ratelimiter::new(50);

        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("5"));
        headers.insert("x-ratelimit-reset-after", HeaderValue::from_static("2.5"));
        headers.insert("x-ratelimit-bucket", HeaderValue::from_static("abcd"));

        let start = Instant::now();

        {
            let mut permit = ratelimiter.acquire(&key()).await;
            permit.update(&headers);
        }

        let _permit = ratelimiter.acquire(&key()).await;

        assert!(Instant::now() >= start + Duration::from_secs_f64(2.5));
    }

    #[tokio::test(start_paused = true)]
    async fn global_lockout_gates_every_bucket() {
        let ratelimiter = Ratelimiter::new(50);
        let start = Instant::now();

        ratelimiter.lock_global(Duration::from_secs(4));

        let other = Route::GetGateway.bucket_key();
        let _permit = ratelimiter.acquire(&other).await;

        assert!(Instant::now() >= start + Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn independent_buckets_do_not_serialize() {
        let ratelimiter = Ratelimiter::new(50);
        let reset_at = Instant::now() + Duration::from_secs(60);

        {
            let mut permit = ratelimiter.acquire(&key()).await;
            permit.set(0, reset_at);
        }

        // a different channel's bucket is unaffected
        let other = Route::CreateMessage {
            channel_id: Id::new(2),
        }
        .bucket_key();

        let before = Instant::now();
        let _permit = ratelimiter.acquire(&other).await;

        assert_eq!(Instant::now(), before);
    }
}
