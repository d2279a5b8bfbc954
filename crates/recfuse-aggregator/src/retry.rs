//! Linear back-off retry for transient Metrics Store and behavior-log errors.

use std::future::Future;
use std::time::Duration;

use recfuse_core::StoreError;

/// Result of [`retry_transient`]: the value or final error, plus how many
/// attempts were made.
#[derive(Debug)]
pub(crate) struct Attempted<T> {
    pub(crate) result: Result<T, StoreError>,
    pub(crate) attempts: u32,
}

/// Runs `operation` up to `max_attempts` times in total.
///
/// Only [`StoreError::is_transient`] errors are retried. Attempt `n` that
/// fails is followed by a sleep of `base_delay × n`.
pub(crate) async fn retry_transient<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    label: &str,
    mut operation: F,
) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(label, attempts = attempt, "succeeded after retry");
                }
                return Attempted {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = base_delay.saturating_mul(attempt);
                tracing::warn!(
                    label,
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                return Attempted {
                    result: Err(err),
                    attempts: attempt,
                };
            }
        }
    }
}
