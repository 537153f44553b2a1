//! Bounded retry with exponential backoff
//!
//! Every retry loop in the engine goes through this one combinator instead
//! of hand-rolled attempt counters and sleeps.

use punchcard_core::{PunchError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run `op` up to `max_attempts` times, sleeping `base_delay * 2^attempt`
/// between attempts (attempt numbering starts at 1, so the first backoff is
/// `base_delay * 2`). The closure receives the 1-based attempt number.
/// Returns the first success or the last error.
pub async fn retry_with_backoff<T, F, Fut>(
    max_attempts: usize,
    base_delay: Duration,
    label: &str,
    op: F,
) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_backoff_if(max_attempts, base_delay, label, |_| true, op).await
}

/// Like [`retry_with_backoff`], but an error is only retried while
/// `retryable` says so; a non-retryable error is returned immediately,
/// whatever the attempt count.
pub async fn retry_with_backoff_if<T, F, Fut, P>(
    max_attempts: usize,
    base_delay: Duration,
    label: &str,
    mut retryable: P,
    mut op: F,
) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
    P: FnMut(&PunchError) -> bool,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && retryable(&e) => {
                let delay = base_delay * 2u32.saturating_pow(attempt as u32);
                warn!(
                    "{} failed on attempt {}/{}: {} (retrying in {:?})",
                    label, attempt, max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!("{} failed on final attempt {}/{}: {}", label, attempt, max_attempts, e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use punchcard_core::PunchError;
    use std::cell::Cell;

    #[tokio::test]
    async fn returns_first_success() {
        let calls = Cell::new(0);
        let result = retry_with_backoff(3, Duration::from_millis(1), "op", |_| {
            calls.set(calls.get() + 1);
            async { Ok::<_, PunchError>(42) }
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = Cell::new(0);
        let result = retry_with_backoff(3, Duration::from_millis(1), "op", |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt < 3 {
                    Err(PunchError::Other("not yet".to_string()))
                } else {
                    Ok("done")
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, "done");
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn surfaces_last_error_after_exhaustion() {
        let calls = Cell::new(0);
        let result: Result<()> = retry_with_backoff(2, Duration::from_millis(1), "op", |attempt| {
            calls.set(calls.get() + 1);
            async move { Err(PunchError::Other(format!("attempt {}", attempt))) }
        })
        .await;
        assert_eq!(calls.get(), 2);
        assert!(matches!(result, Err(PunchError::Other(msg)) if msg == "attempt 2"));
    }

    #[tokio::test]
    async fn non_retryable_error_short_circuits() {
        let calls = Cell::new(0);
        let result: Result<()> = retry_with_backoff_if(
            3,
            Duration::from_millis(1),
            "op",
            |e| !matches!(e, PunchError::ValidationFailed(_)),
            |_| {
                calls.set(calls.get() + 1);
                async { Err(PunchError::ValidationFailed("overlap".to_string())) }
            },
        )
        .await;
        assert_eq!(calls.get(), 1);
        assert!(matches!(result, Err(PunchError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn retryable_error_still_backs_off() {
        let calls = Cell::new(0);
        let result = retry_with_backoff_if(
            2,
            Duration::from_millis(1),
            "op",
            |e| matches!(e, PunchError::Browser(_)),
            |attempt| {
                calls.set(calls.get() + 1);
                async move {
                    if attempt < 2 {
                        Err(PunchError::Browser("flaky".to_string()))
                    } else {
                        Ok(7)
                    }
                }
            },
        )
        .await
        .unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(result, 7);
    }
}
