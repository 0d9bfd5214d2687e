//! Pacing and bounded retry for browser fetches.
//!
//! Every wait here races the run's cancellation token, so a cancelled crawl
//! never sits out a full delay or backoff.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{FetchError, FetchErrorKind};

/// Sleeps for `duration` unless `cancel` fires first.
///
/// Returns `false` when the wait was cut short by cancellation.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

/// Returns `true` for failures that may clear on a second attempt.
///
/// Only navigation timeouts and connection-level errors qualify; a block
/// page, an empty extraction or a protocol error would just repeat.
pub(crate) fn is_retriable(err: &FetchError) -> bool {
    matches!(
        err.kind,
        FetchErrorKind::NavigationTimeout | FetchErrorKind::Network
    )
}

/// Runs `operation` with up to `max_retries` additional attempts on
/// transient errors.
///
/// Back-off doubles from `backoff_base` with ±25 % jitter and is capped at
/// 60 s. `max_retries = 0` means a single attempt.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base: Duration,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let base_ms = u64::try_from(backoff_base.as_millis()).unwrap_or(u64::MAX);
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
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
                    "transient fetch error, retrying after back-off"
                );
                if !sleep_or_cancel(Duration::from_millis(delay_ms), cancel).await {
                    return Err(FetchError::cancelled(err.target));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn err(kind: FetchErrorKind) -> FetchError {
        FetchError::new(kind, "current lookup 840", "boom")
    }

    #[test]
    fn only_timeouts_and_network_errors_are_retriable() {
        assert!(is_retriable(&err(FetchErrorKind::NavigationTimeout)));
        assert!(is_retriable(&err(FetchErrorKind::Network)));
        assert!(!is_retriable(&err(FetchErrorKind::BlockedByOrigin)));
        assert!(!is_retriable(&err(FetchErrorKind::Browser)));
        assert!(!is_retriable(&err(FetchErrorKind::ExtractionEmpty)));
        assert!(!is_retriable(&err(FetchErrorKind::Cancelled)));
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let cancel = CancellationToken::new();
        let result = retry_with_backoff(0, Duration::ZERO, &cancel, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, FetchError>(err(FetchErrorKind::NavigationTimeout))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().kind, FetchErrorKind::NavigationTimeout);
    }

    #[tokio::test]
    async fn retries_transient_error_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let cancel = CancellationToken::new();
        let result = retry_with_backoff(3, Duration::ZERO, &cancel, || {
            let c = Arc::clone(&c);
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(err(FetchErrorKind::Network))
                } else {
                    Ok::<u32, FetchError>(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_block_page() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let cancel = CancellationToken::new();
        let result = retry_with_backoff(3, Duration::ZERO, &cancel, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, FetchError>(err(FetchErrorKind::BlockedByOrigin))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().kind, FetchErrorKind::BlockedByOrigin);
    }

    #[tokio::test]
    async fn cancellation_interrupts_backoff() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = retry_with_backoff(3, Duration::from_secs(30), &cancel, || async {
            Err::<u32, FetchError>(err(FetchErrorKind::Network))
        })
        .await;
        assert_eq!(result.unwrap_err().kind, FetchErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn sleep_or_cancel_reports_cancellation() {
        let cancel = CancellationToken::new();
        assert!(sleep_or_cancel(Duration::from_millis(1), &cancel).await);
        cancel.cancel();
        assert!(!sleep_or_cancel(Duration::from_secs(30), &cancel).await);
        assert!(!sleep_or_cancel(Duration::ZERO, &cancel).await);
    }
}
