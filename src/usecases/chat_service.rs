//! Chat session use case. Keeps the transcript and routes each prompt.
//!
//! Knowledge-base mode goes through `ResilientRetrievalClient`; direct mode sends the
//! whole history to the language model.

use crate::domain::{
    ConversationMessage, DomainError, FatalError, GenerationParams, NO_USER_MESSAGE,
    RetrievalOutcome, RetryPolicy, Role,
};
use crate::ports::ChatModelPort;
use crate::usecases::retrieval_service::ResilientRetrievalClient;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Reply text for a request cancelled before it produced an answer.
pub const REQUEST_CANCELLED: &str = "Request cancelled.";

/// How replies are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    /// Grounded in the knowledge base (retrieve and generate).
    KnowledgeBase,
    /// Plain model call with the conversation so far.
    Direct,
}

impl ChatMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "kb" | "knowledge-base" | "knowledge_base" => Some(ChatMode::KnowledgeBase),
            "direct" | "model" => Some(ChatMode::Direct),
            _ => None,
        }
    }
}

/// Chat session. One per front-end session; history lives in memory only.
pub struct ChatService {
    mode: ChatMode,
    retrieval: Arc<ResilientRetrievalClient>,
    model: Arc<dyn ChatModelPort>,
    knowledge_base_id: String,
    model_reference: String,
    retry_policy: RetryPolicy,
    params: GenerationParams,
    history: Mutex<Vec<ConversationMessage>>,
}

impl ChatService {
    pub fn new(
        mode: ChatMode,
        retrieval: Arc<ResilientRetrievalClient>,
        model: Arc<dyn ChatModelPort>,
        knowledge_base_id: String,
        model_reference: String,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            mode,
            retrieval,
            model,
            knowledge_base_id,
            model_reference,
            retry_policy,
            params: GenerationParams::default(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Send a prompt and return the reply text.
    ///
    /// The prompt is recorded first. The reply is recorded only when one was produced;
    /// a non-retryable backend error or model failure comes back as `Err`.
    pub async fn send(&self, prompt: &str) -> Result<String, DomainError> {
        self.send_with_cancel(prompt, &CancellationToken::new())
            .await
    }

    /// Like [`send`](Self::send), abandoning the request once `cancel` fires.
    ///
    /// A cancelled prompt is removed from the history again and nothing is recorded for it.
    pub async fn send_with_cancel(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, DomainError> {
        let snapshot = {
            let mut history = self.history.lock().await;
            history.push(ConversationMessage::user(prompt));
            history.clone()
        };

        let reply = match self.mode {
            ChatMode::KnowledgeBase => self.reply_from_knowledge_base(&snapshot, cancel).await?,
            ChatMode::Direct => self.reply_from_model(&snapshot, cancel).await?,
        };

        let Some(reply) = reply else {
            info!("request cancelled");
            self.discard_prompt(prompt).await;
            return Ok(REQUEST_CANCELLED.to_string());
        };

        self.history
            .lock()
            .await
            .push(ConversationMessage::assistant(reply.clone()));
        Ok(reply)
    }

    /// `None` when cancelled.
    async fn reply_from_knowledge_base(
        &self,
        conversation: &[ConversationMessage],
        cancel: &CancellationToken,
    ) -> Result<Option<String>, DomainError> {
        let outcome = self
            .retrieval
            .answer_with_cancel(
                conversation,
                &self.knowledge_base_id,
                &self.model_reference,
                &self.retry_policy,
                cancel,
            )
            .await;

        match outcome {
            RetrievalOutcome::Answer(text) => Ok(Some(text)),
            RetrievalOutcome::NoUserMessage => Ok(Some(NO_USER_MESSAGE.to_string())),
            RetrievalOutcome::TransientUnavailable(message) => {
                warn!("knowledge base unavailable after retries");
                Ok(Some(message))
            }
            RetrievalOutcome::Fatal(FatalError::NonRetryable(e)) => Err(DomainError::Backend(e)),
            RetrievalOutcome::Fatal(fatal) => Ok(Some(fatal.user_message())),
            RetrievalOutcome::Cancelled => Ok(None),
        }
    }

    /// `None` when cancelled.
    async fn reply_from_model(
        &self,
        conversation: &[ConversationMessage],
        cancel: &CancellationToken,
    ) -> Result<Option<String>, DomainError> {
        tokio::select! {
            result = self.model.invoke(conversation, &self.params) => result.map(Some),
            _ = cancel.cancelled() => Ok(None),
        }
    }

    async fn discard_prompt(&self, prompt: &str) {
        let mut history = self.history.lock().await;
        if history
            .last()
            .is_some_and(|m| m.role == Role::User && m.content == prompt)
        {
            history.pop();
        }
    }

    pub async fn history(&self) -> Vec<ConversationMessage> {
        self.history.lock().await.clone()
    }

    /// Clear the transcript.
    pub async fn reset(&self) {
        self.history.lock().await.clear();
    }
}
