//! Exponential backoff for remote calls that get throttled.
//!
//! Only throttling failures (anything whose message mentions `429` or
//! `rate limit`) are retried. Every other error goes straight back to the caller.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Delay schedule for retrying throttled calls.
///
/// `base_delay_ms * 2^attempt`, optionally capped, then perturbed by a uniform
/// `±jitter_fraction` of that value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub base_delay_ms: u64,
    pub max_delay_ms: Option<u64>,
    pub jitter_fraction: f64,
    pub max_retries: u32,
}

impl RetryPolicy {
    /// 1s base, 30s cap, ±25% jitter, 3 retries.
    pub const fn jittered() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: Some(30_000),
            jitter_fraction: 0.25,
            max_retries: 3,
        }
    }

    /// 1s base doubling without cap or jitter, 3 retries.
    pub const fn plain() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: None,
            jitter_fraction: 0.0,
            max_retries: 3,
        }
    }

    /// Delay before jitter for a 0-indexed attempt.
    pub fn base_delay_for(&self, attempt: u32) -> u64 {
        let delay = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        match self.max_delay_ms {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    pub fn delay_for<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base = self.base_delay_for(attempt) as f64;
        let jitter = if self.jitter_fraction > 0.0 {
            base * self.jitter_fraction * rng.gen_range(-1.0f64..=1.0)
        } else {
            0.0
        };
        Duration::from_millis((base + jitter).max(0.0).floor() as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::jittered()
    }
}

pub fn is_throttling_message(message: &str) -> bool {
    message.contains("429") || message.contains("rate limit")
}

/// Run `operation`, retrying throttling failures per `policy`.
///
/// Makes at most `max_retries + 1` attempts. `on_retry(attempt, &err)` fires
/// before each wait; after the last attempt the final error is returned as is.
pub async fn retry_with_backoff<T, E, F, Fut, N>(
    policy: &RetryPolicy,
    mut operation: F,
    mut on_retry: N,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    N: FnMut(u32, &E),
{
    let mut attempt = 0;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_throttling_message(&err.to_string()) {
            debug!(attempt, error = %err, "non-throttling failure, not retrying");
            return Err(err);
        }

        if attempt >= policy.max_retries {
            warn!(attempts = attempt + 1, error = %err, "retries exhausted");
            return Err(err);
        }

        on_retry(attempt, &err);

        // rng is dropped before the await so the future stays Send
        let delay = policy.delay_for(attempt, &mut rand::thread_rng());
        warn!(attempt, delay_ms = delay.as_millis() as u64, "throttled, backing off");
        sleep(delay).await;

        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::fmt;
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    struct TestError(&'static str);

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    const THROTTLED: TestError = TestError("upstream returned 429 Too Many Requests");

    #[test]
    fn throttling_markers() {
        assert!(is_throttling_message("HTTP 429"));
        assert!(is_throttling_message("provider rate limit hit"));
        assert!(!is_throttling_message("401 Unauthorized"));
        assert!(!is_throttling_message("connection reset"));
    }

    #[test]
    fn jittered_delays_stay_within_bounds() {
        let policy = RetryPolicy::jittered();
        let mut rng = StdRng::seed_from_u64(7);

        for attempt in 0..8 {
            let base = (1000u64 * 2u64.pow(attempt)).min(30_000) as f64;
            for _ in 0..500 {
                let ms = policy.delay_for(attempt, &mut rng).as_millis() as f64;
                assert!(
                    ms >= (0.75 * base).floor() && ms <= 1.25 * base,
                    "attempt {attempt}: {ms}"
                );
            }
        }
    }

    #[test]
    fn plain_policy_doubles_without_cap() {
        let policy = RetryPolicy::plain();
        let mut rng = StdRng::seed_from_u64(1);
        let delays: Vec<u128> = (0..6)
            .map(|a| policy.delay_for(a, &mut rng).as_millis())
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000, 32000]);
    }

    #[test]
    fn cap_applies_before_jitter() {
        let policy = RetryPolicy::jittered();
        assert_eq!(policy.base_delay_for(4), 16_000);
        assert_eq!(policy.base_delay_for(5), 30_000);
        assert_eq!(policy.base_delay_for(63), 30_000);
    }

    #[tokio::test(start_paused = true)]
    async fn success_returns_without_delay() {
        let start = Instant::now();
        let mut calls = 0;
        let result: Result<u32, TestError> = retry_with_backoff(
            &RetryPolicy::jittered(),
            || {
                calls += 1;
                async { Ok(7) }
            },
            |_, _| panic!("no retry expected"),
        )
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn non_throttling_error_is_not_retried() {
        let start = Instant::now();
        let mut calls = 0;
        let mut retries = 0;
        let result: Result<(), TestError> = retry_with_backoff(
            &RetryPolicy::jittered(),
            || {
                calls += 1;
                async { Err(TestError("invalid api key")) }
            },
            |_, _| retries += 1,
        )
        .await;

        assert_eq!(result, Err(TestError("invalid api key")));
        assert_eq!(calls, 1);
        assert_eq!(retries, 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_throttling() {
        let mut calls = 0u32;
        let mut seen = Vec::new();
        let result = retry_with_backoff(
            &RetryPolicy::jittered(),
            || {
                calls += 1;
                let n = calls;
                async move { if n <= 2 { Err(THROTTLED) } else { Ok(n) } }
            },
            |attempt, _| seen.push(attempt),
        )
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(seen, vec![0, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_retries_plus_one_attempts() {
        let start = Instant::now();
        let mut calls = 0;
        let mut retries = 0;
        let result: Result<(), TestError> = retry_with_backoff(
            &RetryPolicy::plain(),
            || {
                calls += 1;
                async { Err(TestError("rate limit exceeded")) }
            },
            |_, _| retries += 1,
        )
        .await;

        assert_eq!(result, Err(TestError("rate limit exceeded")));
        assert_eq!(calls, 4);
        assert_eq!(retries, 3);
        // 1s + 2s + 4s of virtual time
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(7000) && waited < Duration::from_millis(7100));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_single_attempt() {
        let policy = RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::plain()
        };
        let mut calls = 0;
        let result: Result<(), TestError> = retry_with_backoff(
            &policy,
            || {
                calls += 1;
                async { Err(THROTTLED) }
            },
            |_, _| {},
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
