//! In-memory rate limiter.
//!
//! Fixed-window counters keyed by the hashed client key.  Each key gets
//! `max_attempts` hits per decay window; when the window expires the
//! counter resets.  Implements the kernel [`RateLimiter`] contract.

use dashmap::DashMap;
use rampart_kernel::collab::RateLimiter;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Counter state for one key.
struct Window {
    hits: u32,
    started: Instant,
    decay: Duration,
}

impl Window {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.started) >= self.decay
    }

    /// Seconds until this window expires (zero once expired).
    fn remaining_secs(&self, now: Instant) -> u64 {
        self.decay
            .saturating_sub(now.duration_since(self.started))
            .as_secs()
    }
}

/// Concurrent fixed-window rate limiter.
#[derive(Default)]
pub struct InMemoryRateLimiter {
    windows: DashMap<String, Window>,
}

impl InMemoryRateLimiter {
    /// Empty limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove expired windows to keep memory usage bounded.
    ///
    /// Call this periodically (e.g. every minute) from a background task.
    pub fn gc(&self) {
        let now = Instant::now();
        self.windows.retain(|_, window| !window.expired(now));
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn too_many_attempts(&self, key: &str, max_attempts: u32) -> bool {
        let now = Instant::now();
        match self.windows.get(key) {
            Some(window) if !window.expired(now) => window.hits >= max_attempts,
            _ => false,
        }
    }

    fn hit(&self, key: &str, decay_secs: u64) {
        let now = Instant::now();
        let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| Window {
            hits: 0,
            started: now,
            decay: Duration::from_secs(decay_secs),
        });
        if entry.expired(now) {
            entry.hits = 0;
            entry.started = now;
            entry.decay = Duration::from_secs(decay_secs);
        }
        entry.hits += 1;
    }

    fn remaining(&self, key: &str, max_attempts: u32) -> u32 {
        let now = Instant::now();
        match self.windows.get(key) {
            Some(window) if !window.expired(now) => max_attempts.saturating_sub(window.hits),
            _ => max_attempts,
        }
    }

    fn available_in(&self, key: &str) -> u64 {
        let now = Instant::now();
        match self.windows.get(key) {
            Some(window) => window.remaining_secs(now),
            None => 0,
        }
    }

    fn available_at(&self, key: &str) -> Option<u64> {
        let now = Instant::now();
        let window = self.windows.get(key)?;
        let until_reset = window.remaining_secs(now);
        let epoch_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        Some(epoch_now + until_reset)
    }
}
