//! Bedrock Agent Runtime adapter. Implements `RetrievalPort` via `POST /retrieveAndGenerate`.

use super::http::ServiceClient;
use crate::domain::{BackendFailure, RetrievalRequest};
use crate::ports::RetrievalPort;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct AgentRuntimeAdapter {
    http: ServiceClient,
}

impl AgentRuntimeAdapter {
    pub fn new(http: ServiceClient) -> Self {
        Self { http }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveAndGenerateRequest<'a> {
    input: Input<'a>,
    retrieve_and_generate_configuration: Configuration<'a>,
}

#[derive(Serialize)]
struct Input<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Configuration<'a> {
    #[serde(rename = "type")]
    config_type: &'static str,
    knowledge_base_configuration: KnowledgeBaseConfiguration<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KnowledgeBaseConfiguration<'a> {
    knowledge_base_id: &'a str,
    model_arn: &'a str,
}

#[derive(Deserialize)]
struct RetrieveAndGenerateResponse {
    output: Output,
}

#[derive(Deserialize)]
struct Output {
    text: String,
}

#[async_trait::async_trait]
impl RetrievalPort for AgentRuntimeAdapter {
    async fn retrieve_and_generate(
        &self,
        request: &RetrievalRequest,
    ) -> Result<String, BackendFailure> {
        let body = RetrieveAndGenerateRequest {
            input: Input {
                text: &request.query_text,
            },
            retrieve_and_generate_configuration: Configuration {
                config_type: "KNOWLEDGE_BASE",
                knowledge_base_configuration: KnowledgeBaseConfiguration {
                    knowledge_base_id: &request.knowledge_source_id,
                    model_arn: &request.model_reference,
                },
            },
        };

        let req = self
            .http
            .request(Method::POST, "/retrieveAndGenerate")
            .json(&body);
        let response: RetrieveAndGenerateResponse = self.http.send_json(req).await?;

        debug!(answer_len = response.output.text.len(), "received grounded answer");
        Ok(response.output.text)
    }
}
