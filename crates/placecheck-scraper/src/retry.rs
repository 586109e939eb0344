//! Exponential backoff for transient fetch failures.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

const MAX_DELAY_MS: u64 = 30_000;

/// Returns `true` if `err` is worth another attempt after a delay.
///
/// Timeouts, refused connections, 429 and 5xx responses are transient.
/// Builder, redirect and body-decode failures will fail the same way again,
/// as will any other status and every browser error.
pub(crate) fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        ScraperError::RateLimited { .. } => true,
        ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
        ScraperError::BrowserUnavailable(_)
        | ScraperError::Browser(_)
        | ScraperError::Timeout { .. } => false,
    }
}

/// Upper bound of the wait before retry number `retry` (1-based).
fn backoff_ceiling(retry: u32, backoff_base_ms: u64) -> u64 {
    let doublings = retry.saturating_sub(1).min(10);
    backoff_base_ms
        .saturating_mul(1u64 << doublings)
        .min(MAX_DELAY_MS)
}

/// Scales `ceiling_ms` by a uniform factor in `[0.75, 1.25)`.
fn with_jitter(ceiling_ms: u64) -> u64 {
    if ceiling_ms == 0 {
        return 0;
    }
    let spread = ceiling_ms / 2;
    let floor = ceiling_ms - ceiling_ms / 4;
    floor + rand::random_range(0..=spread)
}

/// Executes `operation`, retrying transient errors up to `max_retries` times.
///
/// The n-th retry waits `backoff_base_ms * 2^(n-1)` milliseconds with ±25 %
/// jitter, capped at 30 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut retries = 0u32;
    let mut outcome = operation().await;
    while let Err(err) = &outcome {
        if retries == max_retries || !is_retriable(err) {
            break;
        }
        retries += 1;
        let delay_ms = with_jitter(backoff_ceiling(retries, backoff_base_ms));
        tracing::warn!(
            retry = retries,
            max_retries,
            delay_ms,
            error = %err,
            "transient fetch error, backing off"
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        outcome = operation().await;
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn status(status: u16) -> ScraperError {
        ScraperError::UnexpectedStatus {
            status,
            url: "https://m.place.naver.com/place/1/home".to_owned(),
        }
    }

    #[test]
    fn server_errors_and_throttling_are_retriable() {
        assert!(is_retriable(&status(503)));
        assert!(is_retriable(&ScraperError::RateLimited {
            url: "u".to_owned()
        }));
        assert!(!is_retriable(&status(404)));
        assert!(!is_retriable(&ScraperError::Browser("crash".to_owned())));
    }

    #[test]
    fn request_builder_errors_are_not_retriable() {
        let err = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        assert!(err.is_builder());
        assert!(!is_retriable(&ScraperError::Http(err)));
    }

    #[tokio::test]
    async fn refused_connections_are_retriable() {
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .unwrap_err();
        assert!(is_retriable(&ScraperError::Http(err)));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_ceiling(1, 500), 500);
        assert_eq!(backoff_ceiling(2, 500), 1_000);
        assert_eq!(backoff_ceiling(4, 500), 4_000);
        assert_eq!(backoff_ceiling(20, 500), MAX_DELAY_MS);
        assert_eq!(backoff_ceiling(3, 0), 0);
    }

    #[test]
    fn jitter_stays_within_a_quarter() {
        assert_eq!(with_jitter(0), 0);
        for _ in 0..200 {
            let delay = with_jitter(1_000);
            assert!((750..=1_250).contains(&delay), "delay {delay}");
        }
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                if cc.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(status(502))
                } else {
                    Ok::<u32, ScraperError>(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(2, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScraperError>(status(500))
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result,
            Err(ScraperError::UnexpectedStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScraperError>(status(404))
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }
}
