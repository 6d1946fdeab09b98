//! Domain entities. Pure data structures for the core business.
//!
//! No HTTP/wire types here; adapters map into these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::{BackendError, BackendFailure};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single chat turn. Serialized in the `{role, content}` shape the model expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Returns the content of the most recent user message, scanning from the end.
///
/// Messages after it are ignored. An empty content counts as no message.
pub fn last_user_message(conversation: &[ConversationMessage]) -> Option<&str> {
    conversation
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .filter(|c| !c.is_empty())
}

/// One retrieve-and-generate call. Built per attempt loop, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    pub query_text: String,
    pub knowledge_source_id: String,
    pub model_reference: String,
}

/// Message shown when the knowledge base stays paused through every attempt.
pub const KNOWLEDGE_BASE_UNAVAILABLE: &str = "Sorry, the knowledge base is currently unavailable due to database maintenance. Please try again in a few moments.";

/// Message shown when the conversation holds no user turn.
pub const NO_USER_MESSAGE: &str = "No user message found.";

/// Result of answering one conversation against the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    Answer(String),
    /// No user-authored message; the backend was not contacted.
    NoUserMessage,
    /// Backend stayed paused/resuming until retries ran out.
    TransientUnavailable(String),
    Fatal(FatalError),
    /// Cancelled while waiting between attempts.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    /// Structured backend error that is not an auto-pause condition.
    NonRetryable(BackendError),
    /// Network, serialization or malformed-response failure.
    Transport(String),
}

impl From<BackendFailure> for FatalError {
    fn from(failure: BackendFailure) -> Self {
        match failure {
            BackendFailure::Service(e) => FatalError::NonRetryable(e),
            BackendFailure::Transport(d) => FatalError::Transport(d),
        }
    }
}

impl FatalError {
    /// Text for the transcript. Embeds the underlying description.
    pub fn user_message(&self) -> String {
        let detail = match self {
            FatalError::NonRetryable(e) => e.to_string(),
            FatalError::Transport(d) => d.clone(),
        };
        format!("An error occurred while processing your request: {}", detail)
    }
}

/// Bounded exponential backoff. Attempts run `0..=max_attempts`.
///
/// The wait after failed attempt `n` is `base_delay_seconds^n + jitter_constant`.
/// With the defaults that is `2^n + 1`: 2s, 3s, 5s, 9s, ...
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_seconds: f64,
    pub jitter_constant: f64,
}

/// Retry bound for chat answers.
pub const DEFAULT_MAX_RETRIES: u32 = 10;
/// Retry bound for knowledge-base ingestion jobs.
pub const DEFAULT_SYNC_MAX_RETRIES: u32 = 3;

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Number of calls the loop may make: the first try plus `max_attempts` retries.
    pub fn total_attempts(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }

    /// Backoff to wait after the given failed attempt.
    ///
    /// Negative or NaN results wait zero; overflow and infinity saturate to `Duration::MAX`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay_seconds.powi(exp) + self.jitter_constant;
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            base_delay_seconds: 2.0,
            jitter_constant: 1.0,
        }
    }
}

/// Decoding parameters for direct model calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
            top_p: 1.0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Knowledge-base control plane
// ─────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseSummary {
    pub id: String,
    pub name: String,
    pub status: String,
    pub description: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceSummary {
    pub id: String,
    pub name: String,
    pub status: String,
}

/// A knowledge base resolved by name, with its data sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseInfo {
    pub id: String,
    pub data_sources: Vec<DataSourceSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionJob {
    pub id: String,
    pub status: String,
    pub knowledge_base_id: String,
    pub data_source_id: String,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}
