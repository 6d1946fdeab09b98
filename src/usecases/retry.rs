//! Bounded retry with exponential backoff around the knowledge-base "auto-pause" condition.
//!
//! Only one failure class is retried: a validation error whose message says the
//! backing database is auto-paused or resuming. Everything else ends the loop at once.

use crate::domain::{BackendError, BackendFailure, RetryPolicy};
use crate::ports::Sleeper;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Error code the backend uses for request validation failures, including auto-pause.
pub const VALIDATION_ERROR_CODE: &str = "ValidationException";

const TRANSIENT_MARKERS: &[&str] = &["auto-paused", "resuming"];

/// True when the backend reports its data store as auto-paused or resuming.
///
/// Requires the validation error code; the message match is a case-insensitive substring test.
pub fn is_transient_unavailable(error: &BackendError) -> bool {
    if error.code != VALIDATION_ERROR_CODE {
        return false;
    }
    let message = error.message.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|m| message.contains(m))
}

/// Terminal state of a retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Success(T),
    /// Every attempt hit the transient condition.
    Exhausted { attempts: u32 },
    /// Non-transient failure; returned after the attempt that produced it.
    Failed(BackendFailure),
    Cancelled,
}

/// Run `op` for attempts `0..=policy.max_attempts`, backing off between transient failures.
///
/// `op` receives the attempt number. `label` names the operation in logs.
/// The wait races `cancel`; a cancelled token stops the loop before the next attempt.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
    label: &str,
    mut op: F,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, BackendFailure>>,
{
    for attempt in 0..=policy.max_attempts {
        if cancel.is_cancelled() {
            return RetryOutcome::Cancelled;
        }

        let error = match op(attempt).await {
            Ok(value) => {
                debug!(label, attempt, "backend call succeeded");
                return RetryOutcome::Success(value);
            }
            Err(BackendFailure::Service(e)) if is_transient_unavailable(&e) => e,
            Err(other) => return RetryOutcome::Failed(other),
        };

        if attempt == policy.max_attempts {
            warn!(
                label,
                attempts = policy.total_attempts(),
                error = %error,
                "still auto-paused after max retries"
            );
            break;
        }

        let wait = policy.delay_for(attempt);
        warn!(
            label,
            attempt = attempt.saturating_add(1),
            max_retries = policy.max_attempts,
            wait_secs = wait.as_secs_f64(),
            "database is resuming from auto-pause; waiting before retry"
        );

        tokio::select! {
            _ = sleeper.sleep(wait) => {}
            _ = cancel.cancelled() => {
                debug!(label, attempt, "retry cancelled during backoff");
                return RetryOutcome::Cancelled;
            }
        }
    }

    RetryOutcome::Exhausted {
        attempts: policy.total_attempts(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSleeper {
        waits: Mutex<Vec<Duration>>,
    }

    #[async_trait::async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    struct NeverSleeper;

    #[async_trait::async_trait]
    impl Sleeper for NeverSleeper {
        async fn sleep(&self, _duration: Duration) {
            std::future::pending::<()>().await;
        }
    }

    fn paused() -> BackendFailure {
        BackendFailure::Service(BackendError::new(
            VALIDATION_ERROR_CODE,
            "The database is Auto-Paused, please retry",
        ))
    }

    #[test]
    fn test_predicate_matches_case_insensitive() {
        assert!(is_transient_unavailable(&BackendError::new(
            "ValidationException",
            "Aurora DB is AUTO-PAUSED"
        )));
        assert!(is_transient_unavailable(&BackendError::new(
            "ValidationException",
            "cluster Resuming, try later"
        )));
    }

    #[test]
    fn test_predicate_rejects_other_codes_and_messages() {
        assert!(!is_transient_unavailable(&BackendError::new(
            "ThrottlingException",
            "database is auto-paused"
        )));
        assert!(!is_transient_unavailable(&BackendError::new(
            "ValidationException",
            "knowledgeBaseId is malformed"
        )));
        assert!(!is_transient_unavailable(&BackendError::new(
            "validationexception",
            "resuming"
        )));
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let outcome = retry_transient(
            &RetryPolicy::new(5),
            &sleeper,
            &CancellationToken::new(),
            "test",
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { if attempt < 3 { Err(paused()) } else { Ok("done") } }
            },
        )
        .await;

        assert_eq!(outcome, RetryOutcome::Success("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let waits = sleeper.waits.lock().unwrap().clone();
        assert_eq!(
            waits,
            vec![
                Duration::from_secs(2),
                Duration::from_secs(3),
                Duration::from_secs(5)
            ]
        );
        assert_eq!(waits.iter().sum::<Duration>(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_success_on_last_allowed_attempt() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let outcome = retry_transient(
            &RetryPolicy::new(3),
            &sleeper,
            &CancellationToken::new(),
            "test",
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { if attempt < 3 { Err(paused()) } else { Ok(attempt) } }
            },
        )
        .await;

        assert_eq!(outcome, RetryOutcome::Success(3));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            sleeper.waits.lock().unwrap().iter().sum::<Duration>(),
            Duration::from_secs(10)
        );
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts_plus_one() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<()> = retry_transient(
            &RetryPolicy::new(3),
            &sleeper,
            &CancellationToken::new(),
            "test",
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(paused()) }
            },
        )
        .await;

        assert_eq!(outcome, RetryOutcome::Exhausted { attempts: 4 });
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(sleeper.waits.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_zero_max_attempts_tries_once() {
        let sleeper = RecordingSleeper::default();
        let outcome: RetryOutcome<()> = retry_transient(
            &RetryPolicy::new(0),
            &sleeper,
            &CancellationToken::new(),
            "test",
            |_| async { Err(paused()) },
        )
        .await;

        assert_eq!(outcome, RetryOutcome::Exhausted { attempts: 1 });
        assert!(sleeper.waits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_transient_fails_without_waiting() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let denied = BackendFailure::Service(BackendError::new(
            "AccessDeniedException",
            "not authorized",
        ));
        let expected = denied.clone();
        let outcome: RetryOutcome<()> = retry_transient(
            &RetryPolicy::default(),
            &sleeper,
            &CancellationToken::new(),
            "test",
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                let denied = denied.clone();
                async move { Err(denied) }
            },
        )
        .await;

        assert_eq!(outcome, RetryOutcome::Failed(expected));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.waits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_not_retried() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<()> = retry_transient(
            &RetryPolicy::default(),
            &RecordingSleeper::default(),
            &CancellationToken::new(),
            "test",
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(BackendFailure::Transport("connection reset".into())) }
            },
        )
        .await;

        assert_eq!(
            outcome,
            RetryOutcome::Failed(BackendFailure::Transport("connection reset".into()))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_backoff() {
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let trigger = cancel.clone();
        let outcome: RetryOutcome<()> = retry_transient(
            &RetryPolicy::default(),
            &NeverSleeper,
            &cancel,
            "test",
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                trigger.cancel();
                async { Err(paused()) }
            },
        )
        .await;

        assert_eq!(outcome, RetryOutcome::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<()> = retry_transient(
            &RetryPolicy::default(),
            &RecordingSleeper::default(),
            &cancel,
            "test",
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
        )
        .await;

        assert_eq!(outcome, RetryOutcome::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
