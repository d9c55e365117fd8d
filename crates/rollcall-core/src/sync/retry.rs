//! Bounded exponential-backoff retry for remote operations.

use std::future::Future;
use std::time::Duration;

/// Retry schedule: `max_retries` extra attempts after the first, sleeping
/// `initial_delay` and multiplying by `backoff_factor` between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(300),
            backoff_factor: 2,
        }
    }
}

impl RetryPolicy {
    /// A single attempt with no retries.
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            backoff_factor: 1,
        }
    }
}

/// Run `operation`, retrying every failure per `policy`.
///
/// `on_error` observes each failure that will be retried, with the 1-based
/// retry number. The last error is returned unchanged once retries run out.
pub async fn retry_with_backoff<T, E, F, Fut, H>(
    policy: &RetryPolicy,
    operation: F,
    on_error: H,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    H: FnMut(u32, &E),
{
    retry_with_backoff_when(policy, operation, |_| true, on_error).await
}

/// Like [`retry_with_backoff`], but gives up immediately on errors for which
/// `should_retry` is false.
pub async fn retry_with_backoff_when<T, E, F, Fut, P, H>(
    policy: &RetryPolicy,
    mut operation: F,
    mut should_retry: P,
    mut on_error: H,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E) -> bool,
    H: FnMut(u32, &E),
{
    let mut attempt = 0;
    let mut delay = policy.initial_delay;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= policy.max_retries || !should_retry(&error) {
                    return Err(error);
                }

                attempt += 1;
                on_error(attempt, &error);
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(policy.backoff_factor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(1),
            backoff_factor: 2,
        }
    }

    #[test]
    fn default_policy_matches_documented_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay, Duration::from_millis(300));
        assert_eq!(policy.backoff_factor, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn succeeds_after_two_failures_and_reports_each() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let mut reported = Vec::new();

        let value = retry_with_backoff(
            &fast_policy(3),
            move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::Offline("down".into()))
                } else {
                    Ok("done")
                }
            },
            |attempt, _| reported.push(attempt),
        )
        .await
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(reported, vec![1, 2]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn exhausting_retries_returns_last_error() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let mut hook_calls = 0;

        let error = retry_with_backoff(
            &fast_policy(2),
            move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::Transport(format!("attempt {n}")))
            },
            |_, _| hook_calls += 1,
        )
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(hook_calls, 2);
        assert!(matches!(error, Error::Transport(message) if message == "attempt 2"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn predicate_stops_on_permanent_errors() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let error = retry_with_backoff_when(
            &fast_policy(3),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::AlreadyCheckedIn("p001".into()))
            },
            Error::is_retryable,
            |_, _| {},
        )
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(error, Error::AlreadyCheckedIn(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn no_retry_policy_runs_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = retry_with_backoff(
            &RetryPolicy::none(),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::Timeout("slow".into()))
            },
            |_, _| {},
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
