//! Retry plumbing for upstream fetches: a small error taxonomy plus an
//! exponential-backoff loop. Only transient failures are retried; a 404 or
//! an empty body surfaces immediately so callers can record the outcome.
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use thiserror::Error;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    /// Upstream says the resource does not exist. Not retryable.
    #[error("not found: {0}")]
    NotFound(String),
    /// Upstream answered but the body had nothing usable. Not retryable.
    #[error("empty payload: {0}")]
    EmptyPayload(String),
    /// Network trouble or a server-side hiccup. Retryable.
    #[error(transparent)]
    Transient(#[from] anyhow::Error),
    /// Every attempt failed with a transient error.
    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }
}

/// Map an HTTP status to the fetch-error taxonomy. `Ok` means proceed with
/// the body. Statuses outside the explicit buckets count as transient; a
/// surprise 401 from a scrape target usually clears on its own.
pub fn check_status(status: StatusCode, what: &str) -> Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound(what.to_string()));
    }
    Err(FetchError::Transient(anyhow::anyhow!(
        "{what}: upstream returned {status}"
    )))
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: crate::util::env::env_parse("FETCH_MAX_ATTEMPTS", defaults.max_attempts)
                .max(1),
            base_backoff: Duration::from_millis(crate::util::env::env_parse(
                "FETCH_BACKOFF_MS",
                defaults.base_backoff.as_millis() as u64,
            )),
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = self.base_backoff.saturating_mul(1 << (attempt - 1).min(10));
        let capped = exp.min(MAX_BACKOFF);
        let half_ms = (capped.as_millis() as u64 / 2).max(1);
        let jitter = rand::thread_rng().gen_range(0..=half_ms);
        capped + Duration::from_millis(jitter)
    }
}

/// Run `op` until it succeeds or the policy is spent. Transient errors sleep
/// a jittered exponential backoff between attempts; every other error kind
/// returns on the spot.
pub async fn fetch_with_retry<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(FetchError::Transient(err)) => {
                if attempt >= policy.max_attempts {
                    return Err(FetchError::Exhausted {
                        attempts: attempt,
                        last_error: err.to_string(),
                    });
                }
                let wait = policy.backoff_for(attempt);
                tracing::warn!(
                    label = %label,
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    error = %err,
                    "transient fetch failure, backing off"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(other) => return Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = fetch_with_retry("box score", &quick_policy(3), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(FetchError::Transient(anyhow::anyhow!("connection reset")))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fetch_with_retry("roster", &quick_policy(2), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Transient(anyhow::anyhow!("timed out")))
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        match result {
            Err(FetchError::Exhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("timed out"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_found_short_circuits() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fetch_with_retry("player page", &quick_policy(5), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::NotFound("player 99999".into()))
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(FetchError::NotFound(_))));
    }

    #[tokio::test]
    async fn empty_payload_short_circuits() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fetch_with_retry("standings", &quick_policy(5), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::EmptyPayload("standings 2025".into()))
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(FetchError::EmptyPayload(_))));
    }

    #[test]
    fn status_mapping_buckets() {
        assert!(check_status(StatusCode::OK, "x").is_ok());
        assert!(matches!(
            check_status(StatusCode::NOT_FOUND, "x"),
            Err(FetchError::NotFound(_))
        ));
        for status in [
            StatusCode::REQUEST_TIMEOUT,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
        ] {
            assert!(matches!(
                check_status(status, "x"),
                Err(FetchError::Transient(_))
            ));
        }
    }
}
