//! Mock adapters for running without credentials.
//!
//! Return canned responses instead of calling AWS. Simulate network latency with a configurable delay.

use crate::domain::{
    BackendError, BackendFailure, ConversationMessage, DataSourceSummary, DomainError,
    GenerationParams, IngestionJob, KnowledgeBaseSummary, Page, RetrievalRequest,
};
use crate::ports::{
    BlobStorePort, ChatModelPort, FunctionPort, KnowledgeBaseAdminPort, RetrievalPort,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::info;

/// Mock retrieval backend.
///
/// Can pretend the knowledge base is auto-paused for the first `paused_calls` calls,
/// which exercises the retry path end to end.
pub struct MockRetrievalAdapter {
    /// Simulated network delay in milliseconds.
    delay_ms: u64,
    paused_calls: u32,
    calls: AtomicU32,
}

impl MockRetrievalAdapter {
    /// Create a new mock adapter with default delay (100ms), never paused.
    pub fn new() -> Self {
        Self::with_delay(100)
    }

    pub fn with_delay(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            paused_calls: 0,
            calls: AtomicU32::new(0),
        }
    }

    /// Report "auto-paused" for the first `calls` requests.
    pub fn paused_for(mut self, calls: u32) -> Self {
        self.paused_calls = calls;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockRetrievalAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RetrievalPort for MockRetrievalAdapter {
    async fn retrieve_and_generate(
        &self,
        request: &RetrievalRequest,
    ) -> Result<String, BackendFailure> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        info!(
            knowledge_base_id = %request.knowledge_source_id,
            call = n,
            "[MOCK] Simulating retrieve and generate"
        );

        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;

        if n < self.paused_calls {
            return Err(BackendFailure::Service(BackendError::new(
                "ValidationException",
                "[MOCK] The knowledge base storage is auto-paused and resuming. Retry shortly.",
            )));
        }

        Ok(format!(
            "[MOCK] Grounded answer to \"{}\" from knowledge base {}. \
             Configure an API key to query the real service.",
            request.query_text, request.knowledge_source_id
        ))
    }
}

/// Mock language model.
pub struct MockChatModel {
    delay_ms: u64,
}

impl MockChatModel {
    pub fn new() -> Self {
        Self { delay_ms: 100 }
    }

    pub fn with_delay(delay_ms: u64) -> Self {
        Self { delay_ms }
    }
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ChatModelPort for MockChatModel {
    async fn invoke(
        &self,
        conversation: &[ConversationMessage],
        params: &GenerationParams,
    ) -> Result<String, DomainError> {
        info!(
            turns = conversation.len(),
            max_tokens = params.max_tokens,
            "[MOCK] Simulating model invocation"
        );

        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;

        let last = conversation
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(format!(
            "[MOCK] Reply to \"{}\" ({} turns of context).",
            last,
            conversation.len()
        ))
    }
}

/// Mock blob store with a fixed listing.
pub struct MockBlobStore {
    keys: Vec<String>,
}

impl MockBlobStore {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }
}

#[async_trait::async_trait]
impl BlobStorePort for MockBlobStore {
    async fn list_object_names(&self, bucket: &str, prefix: &str) -> Vec<String> {
        info!(bucket, prefix, "[MOCK] Listing objects");
        self.keys
            .iter()
            .filter(|k| k.starts_with(prefix))
            .map(|k| k.rsplit('/').next().unwrap_or(k).to_string())
            .collect()
    }
}

/// Mock function: echoes the payload back.
pub struct MockFunction;

#[async_trait::async_trait]
impl FunctionPort for MockFunction {
    async fn invoke(&self, payload: &serde_json::Value) -> Option<serde_json::Value> {
        info!("[MOCK] Simulating function invocation");
        Some(serde_json::json!({ "statusCode": 200, "echo": payload }))
    }
}

/// Mock control plane with a single active knowledge base.
pub struct MockKnowledgeBaseAdmin {
    knowledge_base: KnowledgeBaseSummary,
}

impl MockKnowledgeBaseAdmin {
    pub fn new(knowledge_base_id: impl Into<String>) -> Self {
        Self {
            knowledge_base: KnowledgeBaseSummary {
                id: knowledge_base_id.into(),
                name: "mock-knowledge-base".to_string(),
                status: "ACTIVE".to_string(),
                description: Some("[MOCK] offline knowledge base".to_string()),
                updated_at: None,
            },
        }
    }

    fn not_found(id: &str) -> BackendFailure {
        BackendFailure::Service(BackendError::new(
            "ResourceNotFoundException",
            format!("[MOCK] knowledge base {} not found", id),
        ))
    }
}

#[async_trait::async_trait]
impl KnowledgeBaseAdminPort for MockKnowledgeBaseAdmin {
    async fn start_ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
    ) -> Result<IngestionJob, BackendFailure> {
        if knowledge_base_id != self.knowledge_base.id {
            return Err(Self::not_found(knowledge_base_id));
        }
        info!(knowledge_base_id, data_source_id, "[MOCK] Starting ingestion job");
        Ok(IngestionJob {
            id: "mock-job-1".to_string(),
            status: "STARTING".to_string(),
            knowledge_base_id: knowledge_base_id.to_string(),
            data_source_id: data_source_id.to_string(),
        })
    }

    async fn get_knowledge_base(
        &self,
        knowledge_base_id: &str,
    ) -> Result<KnowledgeBaseSummary, BackendFailure> {
        if knowledge_base_id != self.knowledge_base.id {
            return Err(Self::not_found(knowledge_base_id));
        }
        Ok(self.knowledge_base.clone())
    }

    async fn list_knowledge_bases(
        &self,
        _next_token: Option<&str>,
    ) -> Result<Page<KnowledgeBaseSummary>, BackendFailure> {
        Ok(Page {
            items: vec![self.knowledge_base.clone()],
            next_token: None,
        })
    }

    async fn list_data_sources(
        &self,
        knowledge_base_id: &str,
    ) -> Result<Vec<DataSourceSummary>, BackendFailure> {
        if knowledge_base_id != self.knowledge_base.id {
            return Err(Self::not_found(knowledge_base_id));
        }
        Ok(vec![DataSourceSummary {
            id: "mock-data-source".to_string(),
            name: "mock-documents".to_string(),
            status: "AVAILABLE".to_string(),
        }])
    }
}
