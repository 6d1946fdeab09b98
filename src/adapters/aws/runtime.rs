//! Bedrock Runtime adapter. Implements `ChatModelPort` via `POST /model/{id}/invoke`.
//!
//! Anthropic messages format; the reply is the first content block's text.

use super::http::ServiceClient;
use crate::domain::{ConversationMessage, DomainError, GenerationParams};
use crate::ports::ChatModelPort;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

pub struct RuntimeModelAdapter {
    http: ServiceClient,
    model_id: String,
}

impl RuntimeModelAdapter {
    /// `model_id` is a model id or inference profile id.
    pub fn new(http: ServiceClient, model_id: String) -> Self {
        Self { http, model_id }
    }
}

#[derive(Serialize)]
struct InvokeRequest<'a> {
    anthropic_version: &'static str,
    messages: &'a [ConversationMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct InvokeResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[async_trait::async_trait]
impl ChatModelPort for RuntimeModelAdapter {
    async fn invoke(
        &self,
        conversation: &[ConversationMessage],
        params: &GenerationParams,
    ) -> Result<String, DomainError> {
        info!(
            model = %self.model_id,
            turns = conversation.len(),
            "invoking model"
        );

        let body = InvokeRequest {
            anthropic_version: ANTHROPIC_VERSION,
            messages: conversation,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
        };

        let req = self
            .http
            .request(Method::POST, &format!("/model/{}/invoke", self.model_id))
            .json(&body);
        let response: InvokeResponse = self
            .http
            .send_json(req)
            .await
            .map_err(|e| DomainError::Model(e.to_string()))?;

        response
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| DomainError::Model("No content blocks returned".to_string()))
    }
}
