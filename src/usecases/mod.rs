//! Application use cases. Orchestrate domain logic via ports.

pub mod chat_service;
pub mod kb_admin_service;
pub mod retrieval_service;
pub mod retry;

pub use chat_service::{ChatMode, ChatService, REQUEST_CANCELLED};
pub use kb_admin_service::KnowledgeBaseAdminService;
pub use retrieval_service::ResilientRetrievalClient;
pub use retry::{RetryOutcome, is_transient_unavailable, retry_transient};
