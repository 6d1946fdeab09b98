//! Implements `Sleeper` on the tokio timer. Only the awaiting task is suspended.

use crate::ports::Sleeper;
use std::time::Duration;

pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BackendError, BackendFailure, RetryPolicy};
    use crate::usecases::{RetryOutcome, retry_transient};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_sleep_does_not_block_other_tasks() {
        let slow = tokio::spawn(async { TokioSleeper.sleep(Duration::from_millis(200)).await });
        let fast = tokio::spawn(async { 42 });
        assert_eq!(fast.await.unwrap(), 42);
        assert!(!slow.is_finished());
        slow.abort();
    }

    #[tokio::test]
    async fn test_backoff_waits_on_the_timer() {
        // 1^n - 0.99: 10ms per wait.
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_seconds: 1.0,
            jitter_constant: -0.99,
        };
        let started = tokio::time::Instant::now();

        let outcome = retry_transient(
            &policy,
            &TokioSleeper,
            &CancellationToken::new(),
            "test",
            |attempt| async move {
                if attempt < 2 {
                    Err(BackendFailure::Service(BackendError::new(
                        "ValidationException",
                        "resuming",
                    )))
                } else {
                    Ok(attempt)
                }
            },
        )
        .await;

        assert_eq!(outcome, RetryOutcome::Success(2));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
