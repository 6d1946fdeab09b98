//! Bedrock Agent (control plane) adapter. Implements `KnowledgeBaseAdminPort`.

use super::http::ServiceClient;
use crate::domain::{
    BackendFailure, DataSourceSummary, IngestionJob, KnowledgeBaseSummary, Page,
};
use crate::ports::KnowledgeBaseAdminPort;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

/// Page size for list calls.
const MAX_RESULTS: u32 = 100;

pub struct AgentAdminAdapter {
    http: ServiceClient,
}

impl AgentAdminAdapter {
    pub fn new(http: ServiceClient) -> Self {
        Self { http }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest<'a> {
    max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KnowledgeBaseWire {
    knowledge_base_id: String,
    name: String,
    #[serde(default)]
    status: String,
    description: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<KnowledgeBaseWire> for KnowledgeBaseSummary {
    fn from(w: KnowledgeBaseWire) -> Self {
        Self {
            id: w.knowledge_base_id,
            name: w.name,
            status: w.status,
            description: w.description,
            updated_at: w.updated_at,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListKnowledgeBasesResponse {
    #[serde(default)]
    knowledge_base_summaries: Vec<KnowledgeBaseWire>,
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetKnowledgeBaseResponse {
    knowledge_base: KnowledgeBaseWire,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataSourceWire {
    data_source_id: String,
    name: String,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDataSourcesResponse {
    #[serde(default)]
    data_source_summaries: Vec<DataSourceWire>,
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestionJobWire {
    ingestion_job_id: String,
    #[serde(default)]
    status: String,
    knowledge_base_id: String,
    data_source_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartIngestionJobResponse {
    ingestion_job: IngestionJobWire,
}

#[async_trait::async_trait]
impl KnowledgeBaseAdminPort for AgentAdminAdapter {
    async fn start_ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
    ) -> Result<IngestionJob, BackendFailure> {
        let path = format!(
            "/knowledgebases/{}/datasources/{}/ingestionjobs/",
            knowledge_base_id, data_source_id
        );
        let req = self
            .http
            .request(Method::PUT, &path)
            .json(&serde_json::json!({}));
        let response: StartIngestionJobResponse = self.http.send_json(req).await?;
        let job = response.ingestion_job;
        Ok(IngestionJob {
            id: job.ingestion_job_id,
            status: job.status,
            knowledge_base_id: job.knowledge_base_id,
            data_source_id: job.data_source_id,
        })
    }

    async fn get_knowledge_base(
        &self,
        knowledge_base_id: &str,
    ) -> Result<KnowledgeBaseSummary, BackendFailure> {
        let req = self
            .http
            .request(Method::GET, &format!("/knowledgebases/{}", knowledge_base_id));
        let response: GetKnowledgeBaseResponse = self.http.send_json(req).await?;
        Ok(response.knowledge_base.into())
    }

    async fn list_knowledge_bases(
        &self,
        next_token: Option<&str>,
    ) -> Result<Page<KnowledgeBaseSummary>, BackendFailure> {
        let req = self
            .http
            .request(Method::POST, "/knowledgebases/")
            .json(&ListRequest {
                max_results: MAX_RESULTS,
                next_token,
            });
        let response: ListKnowledgeBasesResponse = self.http.send_json(req).await?;
        Ok(Page {
            items: response
                .knowledge_base_summaries
                .into_iter()
                .map(Into::into)
                .collect(),
            next_token: response.next_token,
        })
    }

    async fn list_data_sources(
        &self,
        knowledge_base_id: &str,
    ) -> Result<Vec<DataSourceSummary>, BackendFailure> {
        let path = format!("/knowledgebases/{}/datasources/", knowledge_base_id);
        let mut sources = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let req = self.http.request(Method::POST, &path).json(&ListRequest {
                max_results: MAX_RESULTS,
                next_token: token.as_deref(),
            });
            let response: ListDataSourcesResponse = self.http.send_json(req).await?;
            sources.extend(response.data_source_summaries.into_iter().map(|d| {
                DataSourceSummary {
                    id: d.data_source_id,
                    name: d.name,
                    status: d.status,
                }
            }));
            match response.next_token {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => break,
            }
        }
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_response() {
        let raw = r#"{
            "knowledgeBaseSummaries": [{
                "knowledgeBaseId": "KB1",
                "name": "docs",
                "status": "ACTIVE",
                "updatedAt": "2025-03-01T12:00:00Z"
            }],
            "nextToken": "abc"
        }"#;
        let parsed: ListKnowledgeBasesResponse = serde_json::from_str(raw).unwrap();
        let kb: KnowledgeBaseSummary = parsed.knowledge_base_summaries.into_iter().next().unwrap().into();
        assert_eq!(kb.id, "KB1");
        assert!(kb.updated_at.is_some());
        assert_eq!(parsed.next_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_list_request_omits_missing_token() {
        let json = serde_json::to_value(ListRequest {
            max_results: 10,
            next_token: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"maxResults": 10}));
    }
}
