//! Lambda adapter. Implements `FunctionPort` by posting JSON to a function URL.

use super::http::ServiceClient;
use crate::ports::FunctionPort;
use reqwest::Method;
use tracing::{debug, error};

pub struct LambdaAdapter {
    /// Bound to the function URL itself.
    http: ServiceClient,
}

impl LambdaAdapter {
    pub fn new(http: ServiceClient) -> Self {
        Self { http }
    }

    async fn try_invoke(&self, payload: &serde_json::Value) -> Result<serde_json::Value, String> {
        let req = self.http.request(Method::POST, "").json(payload);
        let response = self.http.send(req).await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait::async_trait]
impl FunctionPort for LambdaAdapter {
    async fn invoke(&self, payload: &serde_json::Value) -> Option<serde_json::Value> {
        match self.try_invoke(payload).await {
            Ok(value) => Some(value),
            Err(e) => {
                error!("error invoking Lambda function");
                debug!(error = %e, "lambda invocation failure detail");
                None
            }
        }
    }
}
