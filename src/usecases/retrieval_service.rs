//! Knowledge-base grounded answers with auto-pause retries.
//!
//! Picks the latest user turn, asks the retrieval backend, and classifies the result
//! into a `RetrievalOutcome`. The backend client and timer are injected.

use crate::domain::{
    ConversationMessage, FatalError, KNOWLEDGE_BASE_UNAVAILABLE, RetrievalOutcome,
    RetrievalRequest, RetryPolicy, last_user_message,
};
use crate::ports::{RetrievalPort, Sleeper};
use crate::usecases::retry::{RetryOutcome, retry_transient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Retrieval client that rides out the backend's auto-pause window.
///
/// Holds no per-call state; one instance can serve concurrent conversations.
pub struct ResilientRetrievalClient {
    backend: Arc<dyn RetrievalPort>,
    sleeper: Arc<dyn Sleeper>,
}

impl ResilientRetrievalClient {
    pub fn new(backend: Arc<dyn RetrievalPort>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { backend, sleeper }
    }

    /// Answer the latest user message of `conversation` from the given knowledge source.
    pub async fn answer(
        &self,
        conversation: &[ConversationMessage],
        knowledge_source_id: &str,
        model_reference: &str,
        policy: &RetryPolicy,
    ) -> RetrievalOutcome {
        self.answer_with_cancel(
            conversation,
            knowledge_source_id,
            model_reference,
            policy,
            &CancellationToken::new(),
        )
        .await
    }

    /// Same as [`answer`](Self::answer), but stops with `Cancelled` once `cancel` fires.
    pub async fn answer_with_cancel(
        &self,
        conversation: &[ConversationMessage],
        knowledge_source_id: &str,
        model_reference: &str,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> RetrievalOutcome {
        let Some(query) = last_user_message(conversation) else {
            return RetrievalOutcome::NoUserMessage;
        };

        let request = RetrievalRequest {
            query_text: query.to_string(),
            knowledge_source_id: knowledge_source_id.to_string(),
            model_reference: model_reference.to_string(),
        };

        info!(
            knowledge_base_id = %request.knowledge_source_id,
            query_len = request.query_text.len(),
            "retrieve and generate"
        );

        let outcome = retry_transient(
            policy,
            self.sleeper.as_ref(),
            cancel,
            "retrieve_and_generate",
            |_| self.backend.retrieve_and_generate(&request),
        )
        .await;

        match outcome {
            RetryOutcome::Success(text) => RetrievalOutcome::Answer(text),
            RetryOutcome::Exhausted { .. } => {
                RetrievalOutcome::TransientUnavailable(KNOWLEDGE_BASE_UNAVAILABLE.to_string())
            }
            RetryOutcome::Failed(failure) => {
                warn!(error = %failure, "retrieve and generate failed");
                RetrievalOutcome::Fatal(FatalError::from(failure))
            }
            RetryOutcome::Cancelled => RetrievalOutcome::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BackendError, BackendFailure};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Returns scripted results in order and records every request.
    struct ScriptedBackend {
        script: Mutex<VecDeque<Result<String, BackendFailure>>>,
        requests: Mutex<Vec<RetrievalRequest>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<String, BackendFailure>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl RetrievalPort for ScriptedBackend {
        async fn retrieve_and_generate(
            &self,
            request: &RetrievalRequest,
        ) -> Result<String, BackendFailure> {
            self.requests.lock().unwrap().push(request.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(BackendFailure::Transport("script exhausted".into())))
        }
    }

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

    fn resuming() -> Result<String, BackendFailure> {
        Err(BackendFailure::Service(BackendError::new(
            "ValidationException",
            "Database is resuming after being auto-paused.",
        )))
    }

    fn client(
        backend: &Arc<ScriptedBackend>,
    ) -> (ResilientRetrievalClient, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        (
            ResilientRetrievalClient::new(backend.clone(), sleeper.clone()),
            sleeper,
        )
    }

    fn conversation() -> Vec<ConversationMessage> {
        vec![
            ConversationMessage::user("old question"),
            ConversationMessage::assistant("old answer"),
            ConversationMessage::user("what is the refund policy?"),
            ConversationMessage::assistant("trailing"),
        ]
    }

    #[tokio::test]
    async fn test_answer_first_try_uses_last_user_message() {
        let backend = ScriptedBackend::new(vec![Ok("30 days".into())]);
        let (client, sleeper) = client(&backend);

        let outcome = client
            .answer(&conversation(), "KB123", "model-arn", &RetryPolicy::default())
            .await;

        assert_eq!(outcome, RetrievalOutcome::Answer("30 days".into()));
        let requests = backend.requests.lock().unwrap().clone();
        assert_eq!(
            requests,
            vec![RetrievalRequest {
                query_text: "what is the refund policy?".into(),
                knowledge_source_id: "KB123".into(),
                model_reference: "model-arn".into(),
            }]
        );
        assert!(sleeper.waits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_user_message_skips_backend() {
        let backend = ScriptedBackend::new(vec![Ok("unused".into())]);
        let (client, _) = client(&backend);

        let only_assistant = vec![ConversationMessage::assistant("hi")];
        for conv in [Vec::new(), only_assistant] {
            let outcome = client
                .answer(&conv, "KB", "model", &RetryPolicy::default())
                .await;
            assert_eq!(outcome, RetrievalOutcome::NoUserMessage);
        }
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_recovers_after_resume() {
        let backend = ScriptedBackend::new(vec![
            resuming(),
            resuming(),
            resuming(),
            Ok("grounded".into()),
        ]);
        let (client, sleeper) = client(&backend);

        let outcome = client
            .answer(&conversation(), "KB", "model", &RetryPolicy::new(10))
            .await;

        assert_eq!(outcome, RetrievalOutcome::Answer("grounded".into()));
        assert_eq!(backend.calls(), 4);
        let total: Duration = sleeper.waits.lock().unwrap().iter().sum();
        assert_eq!(total, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_answer_on_final_attempt_is_not_exhaustion() {
        let backend = ScriptedBackend::new(vec![resuming(), resuming(), Ok("just in time".into())]);
        let (client, sleeper) = client(&backend);

        let outcome = client
            .answer(&conversation(), "KB", "model", &RetryPolicy::new(2))
            .await;

        assert_eq!(outcome, RetrievalOutcome::Answer("just in time".into()));
        assert_eq!(backend.calls(), 3);
        assert_eq!(
            sleeper.waits.lock().unwrap().clone(),
            vec![Duration::from_secs(2), Duration::from_secs(3)]
        );
    }

    /// Pauses on the first "slow" query only; "fast" queries always answer.
    #[derive(Default)]
    struct PerQueryBackend {
        slow_calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl RetrievalPort for PerQueryBackend {
        async fn retrieve_and_generate(
            &self,
            request: &RetrievalRequest,
        ) -> Result<String, BackendFailure> {
            if request.query_text == "slow" && self.slow_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return resuming();
            }
            Ok(format!("{} answer", request.query_text))
        }
    }

    /// Holds every wait until released.
    #[derive(Default)]
    struct GatedSleeper {
        release: Notify,
    }

    #[async_trait::async_trait]
    impl Sleeper for GatedSleeper {
        async fn sleep(&self, _duration: Duration) {
            self.release.notified().await;
        }
    }

    #[tokio::test]
    async fn test_concurrent_answers_do_not_wait_on_each_other() {
        let sleeper = Arc::new(GatedSleeper::default());
        let client = Arc::new(ResilientRetrievalClient::new(
            Arc::new(PerQueryBackend::default()),
            sleeper.clone(),
        ));

        let slow = tokio::spawn({
            let client = client.clone();
            async move {
                client
                    .answer(
                        &[ConversationMessage::user("slow")],
                        "KB",
                        "model",
                        &RetryPolicy::default(),
                    )
                    .await
            }
        });
        tokio::task::yield_now().await;

        let fast = client
            .answer(
                &[ConversationMessage::user("fast")],
                "KB",
                "model",
                &RetryPolicy::default(),
            )
            .await;

        assert_eq!(fast, RetrievalOutcome::Answer("fast answer".into()));
        assert!(!slow.is_finished());

        sleeper.release.notify_one();
        assert_eq!(
            slow.await.unwrap(),
            RetrievalOutcome::Answer("slow answer".into())
        );
    }

    #[tokio::test]
    async fn test_exhaustion_reports_maintenance() {
        let backend = ScriptedBackend::new((0..3).map(|_| resuming()).collect());
        let (client, sleeper) = client(&backend);

        let outcome = client
            .answer(&conversation(), "KB", "model", &RetryPolicy::new(2))
            .await;

        assert_eq!(
            outcome,
            RetrievalOutcome::TransientUnavailable(KNOWLEDGE_BASE_UNAVAILABLE.into())
        );
        assert_eq!(backend.calls(), 3);
        assert_eq!(
            sleeper.waits.lock().unwrap().clone(),
            vec![Duration::from_secs(2), Duration::from_secs(3)]
        );
    }

    #[tokio::test]
    async fn test_non_retryable_error_is_fatal_immediately() {
        let error = BackendError::new("ResourceNotFoundException", "no such knowledge base");
        let backend = ScriptedBackend::new(vec![
            Err(BackendFailure::Service(error.clone())),
            Ok("unused".into()),
        ]);
        let (client, sleeper) = client(&backend);

        let outcome = client
            .answer(&conversation(), "KB", "model", &RetryPolicy::default())
            .await;

        assert_eq!(
            outcome,
            RetrievalOutcome::Fatal(FatalError::NonRetryable(error))
        );
        assert_eq!(backend.calls(), 1);
        assert!(sleeper.waits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_message_embeds_description() {
        let backend = ScriptedBackend::new(vec![Err(BackendFailure::Transport(
            "dns lookup failed".into(),
        ))]);
        let (client, _) = client(&backend);

        let outcome = client
            .answer(&conversation(), "KB", "model", &RetryPolicy::default())
            .await;

        let RetrievalOutcome::Fatal(fatal) = outcome else {
            panic!("expected fatal outcome, got {:?}", outcome);
        };
        assert_eq!(
            fatal.user_message(),
            "An error occurred while processing your request: dns lookup failed"
        );
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_token_returns_cancelled() {
        let backend = ScriptedBackend::new(vec![Ok("unused".into())]);
        let (client, _) = client(&backend);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = client
            .answer_with_cancel(
                &conversation(),
                "KB",
                "model",
                &RetryPolicy::default(),
                &cancel,
            )
            .await;

        assert_eq!(outcome, RetrievalOutcome::Cancelled);
        assert_eq!(backend.calls(), 0);
    }
}
