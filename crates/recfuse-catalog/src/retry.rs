//! Retry with exponential back-off and jitter for catalog requests.
//!
//! Catalog calls happen on the request path, so the retry budget is small;
//! the Fusion Engine's per-adapter timeout bounds the total time spent here.

use std::future::Future;
use std::time::Duration;

use crate::error::CatalogError;

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// Sleeps `backoff_base_ms × 2^(attempt-1)` ± 25 % jitter between attempts,
/// capped at 10 s. Non-retriable errors are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, CatalogError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CatalogError>>,
{
    const MAX_DELAY_MS: u64 = 10_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retriable() || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "catalog transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn status(code: u16) -> CatalogError {
        CatalogError::UnexpectedStatus {
            status: code,
            url: "http://catalog.test/x".to_owned(),
        }
    }

    #[test]
    fn rate_limit_and_server_errors_are_retriable() {
        assert!(status(429).is_retriable());
        assert!(status(503).is_retriable());
        assert!(!status(404).is_retriable());
        assert!(!CatalogError::InvalidConfig("x".to_owned()).is_retriable());
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(status(503))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(status(401))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1, "4xx must not be retried");
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(status(500))
            }
        })
        .await;
        assert!(matches!(
            result,
            Err(CatalogError::UnexpectedStatus { status: 500, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
