//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;

pub use entities::{
    ConversationMessage, DataSourceSummary, FatalError, GenerationParams, IngestionJob,
    KnowledgeBaseInfo, KnowledgeBaseSummary, Page, RetrievalOutcome, RetrievalRequest, Role,
    RetryPolicy, DEFAULT_MAX_RETRIES, DEFAULT_SYNC_MAX_RETRIES, KNOWLEDGE_BASE_UNAVAILABLE,
    NO_USER_MESSAGE, last_user_message,
};
pub use errors::{BackendError, BackendFailure, DomainError};
