//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    BackendFailure, ConversationMessage, DataSourceSummary, DomainError, GenerationParams,
    IngestionJob, KnowledgeBaseSummary, Page, RetrievalRequest,
};
use std::time::Duration;

/// Knowledge-base retrieval backend. Retrieves documents and generates an answer in one call.
#[async_trait::async_trait]
pub trait RetrievalPort: Send + Sync {
    /// Returns the generated answer text.
    ///
    /// Structured service errors come back as `BackendFailure::Service` so callers can
    /// inspect `code` and `message`; everything else is `BackendFailure::Transport`.
    async fn retrieve_and_generate(
        &self,
        request: &RetrievalRequest,
    ) -> Result<String, BackendFailure>;
}

/// Language model. Single request/response, never retried.
#[async_trait::async_trait]
pub trait ChatModelPort: Send + Sync {
    async fn invoke(
        &self,
        conversation: &[ConversationMessage],
        params: &GenerationParams,
    ) -> Result<String, DomainError>;
}

/// Knowledge-base control plane: ingestion jobs, status, listings.
#[async_trait::async_trait]
pub trait KnowledgeBaseAdminPort: Send + Sync {
    /// Start an ingestion (sync) job for one data source.
    async fn start_ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
    ) -> Result<IngestionJob, BackendFailure>;

    async fn get_knowledge_base(
        &self,
        knowledge_base_id: &str,
    ) -> Result<KnowledgeBaseSummary, BackendFailure>;

    /// One page of knowledge bases. `next_token` is `None` for the first page.
    async fn list_knowledge_bases(
        &self,
        next_token: Option<&str>,
    ) -> Result<Page<KnowledgeBaseSummary>, BackendFailure>;

    async fn list_data_sources(
        &self,
        knowledge_base_id: &str,
    ) -> Result<Vec<DataSourceSummary>, BackendFailure>;
}

/// Blob store listing.
#[async_trait::async_trait]
pub trait BlobStorePort: Send + Sync {
    /// Object names (last path segment of each key) under `prefix`.
    /// Never fails: errors are logged and an empty list is returned.
    async fn list_object_names(&self, bucket: &str, prefix: &str) -> Vec<String>;
}

/// Serverless function invocation with opaque JSON in and out.
#[async_trait::async_trait]
pub trait FunctionPort: Send + Sync {
    /// Returns `None` on any error.
    async fn invoke(&self, payload: &serde_json::Value) -> Option<serde_json::Value>;
}

/// Backoff timer. Must suspend only the calling task.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}
