use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info};

use crate::metrics::RATE_LIMIT_ENTRIES;

// Rate limit entry - tracks requests per client identifier
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
    pub reset_at: Instant,
    pub last_request: Instant, // diagnostic only
}

impl RateLimitEntry {
    fn fresh(now: Instant, window: Duration) -> Self {
        Self {
            count: 0,
            window_start: now,
            reset_at: now + window,
            last_request: now,
        }
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests still admissible in the current window.
    pub remaining: u32,
    /// Time until the current window ends.
    pub reset_in: Duration,
    /// Whole seconds to wait before retrying, only set on rejection.
    pub retry_after: Option<u64>,
}

/// Fixed-window request counter keyed by client identifier.
///
/// One instance lives for the whole process and is shared through `AppState`;
/// nothing is persisted, so all counters start over on restart.
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            limit,
            window,
        }
    }

    /// Admit or reject one request from `identifier`, counting it when admitted.
    pub fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, Instant::now())
    }

    pub fn check_at(&self, identifier: &str, now: Instant) -> RateLimitDecision {
        // the entry guard holds the shard lock, so read-and-increment is atomic per key
        let mut entry = self
            .entries
            .entry(identifier.to_string())
            .or_insert_with(|| RateLimitEntry::fresh(now, self.window));

        // window expired..? reset it
        if now >= entry.reset_at {
            *entry = RateLimitEntry::fresh(now, self.window);
        }

        let reset_in = entry.reset_at.saturating_duration_since(now);

        // over limit
        if entry.count >= self.limit {
            let retry_after = ceil_secs(reset_in);
            let window_age = now.saturating_duration_since(entry.window_start);
            let idle = now.saturating_duration_since(entry.last_request);
            debug!(
                identifier,
                count = entry.count,
                window_age_ms = window_age.as_millis() as u64,
                idle_ms = idle.as_millis() as u64,
                retry_after,
                "request rejected"
            );
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_in,
                retry_after: Some(retry_after),
            };
        }

        entry.count += 1;
        entry.last_request = now;

        RateLimitDecision {
            allowed: true,
            remaining: self.limit - entry.count,
            reset_in,
            retry_after: None,
        }
    }

    /// Drop every entry whose window has already ended. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    pub fn evict_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.reset_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_millis().div_ceil(1000) as u64
}

// Background sweep - keeps the table from growing with one-off clients
pub async fn sweeper(limiter: Arc<RateLimiter>, every: Duration) {
    let mut ticker = interval(every);
    info!(interval = ?every, "rate limit sweeper started");

    loop {
        ticker.tick().await;

        let removed = limiter.evict_expired();
        RATE_LIMIT_ENTRIES.set(limiter.len() as f64);
        if removed > 0 {
            debug!(removed, remaining = limiter.len(), "evicted expired rate limit entries");
        }
    }
}
