//! Knowledge-base housekeeping: ingestion sync, status, lookup by name.

use crate::domain::{
    DomainError, IngestionJob, KnowledgeBaseInfo, KnowledgeBaseSummary, RetryPolicy,
    DEFAULT_SYNC_MAX_RETRIES,
};
use crate::ports::{KnowledgeBaseAdminPort, Sleeper};
use crate::usecases::retry::{RetryOutcome, retry_transient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct KnowledgeBaseAdminService {
    admin: Arc<dyn KnowledgeBaseAdminPort>,
    sleeper: Arc<dyn Sleeper>,
    sync_policy: RetryPolicy,
}

impl KnowledgeBaseAdminService {
    pub fn new(admin: Arc<dyn KnowledgeBaseAdminPort>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            admin,
            sleeper,
            sync_policy: RetryPolicy::new(DEFAULT_SYNC_MAX_RETRIES),
        }
    }

    /// Start an ingestion job so the knowledge base picks up new data source content.
    ///
    /// Retries the auto-pause condition like chat answers do. Returns `None` on any failure.
    pub async fn sync(&self, knowledge_base_id: &str, data_source_id: &str) -> Option<IngestionJob> {
        let outcome = retry_transient(
            &self.sync_policy,
            self.sleeper.as_ref(),
            &CancellationToken::new(),
            "start_ingestion_job",
            |_| self.admin.start_ingestion_job(knowledge_base_id, data_source_id),
        )
        .await;

        match outcome {
            RetryOutcome::Success(job) => {
                info!(job_id = %job.id, status = %job.status, "knowledge base sync started");
                Some(job)
            }
            RetryOutcome::Exhausted { attempts } => {
                warn!(
                    attempts,
                    "knowledge base sync failed after max retries due to database maintenance"
                );
                None
            }
            RetryOutcome::Failed(e) => {
                error!(error = %e, "error syncing knowledge base");
                None
            }
            RetryOutcome::Cancelled => None,
        }
    }

    /// Current knowledge base state, or `None` if it could not be read.
    pub async fn status(&self, knowledge_base_id: &str) -> Option<KnowledgeBaseSummary> {
        match self.admin.get_knowledge_base(knowledge_base_id).await {
            Ok(kb) => Some(kb),
            Err(e) => {
                error!(knowledge_base_id, error = %e, "error getting knowledge base status");
                None
            }
        }
    }

    /// All knowledge bases in the account, following pagination.
    pub async fn list(&self) -> Result<Vec<KnowledgeBaseSummary>, DomainError> {
        let mut all = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .admin
                .list_knowledge_bases(token.as_deref())
                .await
                .map_err(|e| DomainError::Admin(format!("list knowledge bases: {}", e)))?;
            all.extend(page.items);
            match page.next_token {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => break,
            }
        }
        Ok(all)
    }

    /// First knowledge base named exactly `name`, with its data sources.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<KnowledgeBaseInfo>, DomainError> {
        let Some(kb) = self.list().await?.into_iter().find(|kb| kb.name == name) else {
            return Ok(None);
        };
        let data_sources = self
            .admin
            .list_data_sources(&kb.id)
            .await
            .map_err(|e| DomainError::Admin(format!("list data sources: {}", e)))?;
        Ok(Some(KnowledgeBaseInfo {
            id: kb.id,
            data_sources,
        }))
    }
}
