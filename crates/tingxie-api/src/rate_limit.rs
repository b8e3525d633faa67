//! Fixed-window rate limiter middleware for the dictionary proxy.
//!
//! Counts requests in the current wall-clock second and rejects the excess
//! with 429. Applied as an axum middleware through an `Extension`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Extension, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::error::ApiError;

#[derive(Clone)]
pub struct RateLimiter {
    max_per_sec: u64,
    count: Arc<AtomicU64>,
    /// Epoch second of the active window.
    window: Arc<AtomicU64>,
}

impl RateLimiter {
    /// Allow `max_per_sec` requests per second. 0 is treated as 1.
    pub fn new(max_per_sec: u64) -> Self {
        Self {
            max_per_sec: max_per_sec.max(1),
            count: Arc::new(AtomicU64::new(0)),
            window: Arc::new(AtomicU64::new(0)),
        }
    }

    fn try_acquire(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.try_acquire_at(now)
    }

    pub(crate) fn try_acquire_at(&self, now: u64) -> bool {
        let current = self.window.load(Ordering::Relaxed);
        if now != current
            && self
                .window
                .compare_exchange(current, now, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
        {
            self.count.store(1, Ordering::Relaxed);
            return true;
        }

        let prev = self.count.fetch_add(1, Ordering::Relaxed);
        prev < self.max_per_sec
    }
}

pub async fn rate_limit_middleware(
    Extension(limiter): Extension<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    if limiter.try_acquire() {
        next.run(req).await
    } else {
        debug!(path = %req.uri().path(), "Rate limit exceeded");
        ApiError::RateLimited.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_within_one_second() {
        let limiter = RateLimiter::new(3);
        assert!(limiter.try_acquire_at(100));
        assert!(limiter.try_acquire_at(100));
        assert!(limiter.try_acquire_at(100));
        assert!(!limiter.try_acquire_at(100));
    }

    #[test]
    fn test_new_window_resets() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.try_acquire_at(100));
        assert!(!limiter.try_acquire_at(100));
        assert!(limiter.try_acquire_at(101));
    }

    #[test]
    fn test_zero_limit_still_allows_one() {
        let limiter = RateLimiter::new(0);
        assert!(limiter.try_acquire_at(5));
        assert!(!limiter.try_acquire_at(5));
    }
}
