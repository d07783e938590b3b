//! Rate-limit aware retry
//!
//! Public RPC endpoints and the Merkl API both answer 429 under load.
//! Those calls are retried with a fixed delay; every other failure is
//! returned to the caller immediately.

use eyre::Report;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

// ============================================
// RATE LIMIT CLASSIFICATION
// ============================================

/// Marker error for a remote that refused the request because of rate limiting
#[derive(Debug, Clone)]
pub struct RateLimited {
    pub source: String,
}

impl RateLimited {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }
}

impl std::fmt::Display for RateLimited {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rate limited by {}", self.source)
    }
}

impl std::error::Error for RateLimited {}

/// Ways a 429 shows up as a status or error code in transport messages
const STATUS_429_MARKERS: [&str; 6] = [
    "status 429",
    "status: 429",
    "status code 429",
    "code 429",
    "code: 429",
    "error 429",
];

/// True when a message looks like a rate-limit refusal.
///
/// A bare `429` is not enough: response bodies and return data can contain it.
pub fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("rate limit")
        || lower.contains("too many requests")
        || STATUS_429_MARKERS.iter().any(|m| lower.contains(m))
}

/// Check whether an error (anywhere in its chain) is a rate-limit refusal
pub fn is_rate_limited(err: &Report) -> bool {
    err.chain().any(|cause| {
        if cause.downcast_ref::<RateLimited>().is_some() {
            return true;
        }
        if let Some(http) = cause.downcast_ref::<reqwest::Error>() {
            return http.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS);
        }
        false
    })
}

// ============================================
// RETRY POLICY
// ============================================

/// How many times, and how far apart, rate-limited calls are attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: usize, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    pub async fn run<F, Fut, T>(&self, op: F) -> eyre::Result<T>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = eyre::Result<T>>,
    {
        retry_on_rate_limit(op, self.attempts, self.delay).await
    }
}

/// Retry an async operation while it keeps failing with a rate-limit error.
///
/// `op` receives the 1-based attempt number.
pub async fn retry_on_rate_limit<F, Fut, T>(
    mut op: F,
    attempts: usize,
    delay: Duration,
) -> eyre::Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = eyre::Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < attempts && is_rate_limited(&e) => {
                warn!(
                    "Rate limited (attempt {}/{}), retrying in {:?}",
                    attempt, attempts, delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                debug!("Giving up after {} attempt(s): {}", attempt, e);
                return Err(e);
            }
        }
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::eyre;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn retries_rate_limited_until_success() {
        let counter = AtomicUsize::new(0);
        let res = retry_on_rate_limit(
            |_| {
                let current = counter.fetch_add(1, Ordering::Relaxed);
                async move {
                    if current < 2 {
                        Err(Report::new(RateLimited::new("test")))
                    } else {
                        Ok(7u32)
                    }
                }
            },
            4,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(res.unwrap(), 7);
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let counter = AtomicUsize::new(0);
        let res: eyre::Result<u32> = retry_on_rate_limit(
            |_| {
                counter.fetch_add(1, Ordering::Relaxed);
                async { Err(eyre!("execution reverted")) }
            },
            5,
            Duration::from_millis(1),
        )
        .await;

        assert!(res.is_err());
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let counter = AtomicUsize::new(0);
        let res: eyre::Result<u32> = retry_on_rate_limit(
            |attempt| {
                counter.fetch_add(1, Ordering::Relaxed);
                async move { Err(Report::new(RateLimited::new(format!("attempt {attempt}")))) }
            },
            3,
            Duration::from_millis(1),
        )
        .await;

        let err = res.unwrap_err();
        assert!(is_rate_limited(&err));
        assert!(err.to_string().contains("attempt 3"));
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn zero_attempts_still_calls_once() {
        let counter = AtomicUsize::new(0);
        let res = RetryPolicy::new(0, Duration::ZERO)
            .run(|_| {
                counter.fetch_add(1, Ordering::Relaxed);
                async { Ok(1u8) }
            })
            .await;

        assert_eq!(res.unwrap(), 1);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_rate_limit_classification() {
        assert!(is_rate_limited(&Report::new(RateLimited::new("merkl"))));
        assert!(is_rate_limited(
            &Report::new(RateLimited::new("rpc")).wrap_err("eth_call failed")
        ));
        assert!(!is_rate_limited(&eyre!("connection refused")));

        assert!(is_rate_limit_message("HTTP error 429 with body"));
        assert!(is_rate_limit_message("server returned an error response: error code 429: slow down"));
        assert!(is_rate_limit_message("Too Many Requests"));
        assert!(is_rate_limit_message("rate limit exceeded"));
        assert!(!is_rate_limit_message("execution reverted"));
    }

    #[test]
    fn test_429_inside_data_is_not_rate_limit() {
        assert!(!is_rate_limit_message(
            "deserialization error: invalid length at line 1 column 70: 0x00000000000000000000000000000000000004290000"
        ));
        assert!(!is_rate_limit_message("block 18429001 not found"));
    }
}
