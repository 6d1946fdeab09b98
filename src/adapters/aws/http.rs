//! Shared HTTP plumbing for the AWS-style services.
//!
//! One `reqwest::Client` per adapter, per-service authentication, and the error
//! envelope parsing that turns a non-2xx response into a `BackendError`.

use super::sigv4::SigV4Signer;
use crate::domain::{BackendError, BackendFailure};
use crate::shared::config::AwsCredentials;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, Request, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

/// Header carrying the error type, e.g. `ValidationException:http://internal.amazon.com/...`.
const ERROR_TYPE_HEADER: &str = "x-amzn-ErrorType";

/// SigV4 signing names.
pub const BEDROCK_SERVICE: &str = "bedrock";
pub const S3_SERVICE: &str = "s3";
pub const LAMBDA_SERVICE: &str = "lambda";

/// How requests to one service authenticate.
#[derive(Clone)]
pub enum Auth {
    Anonymous,
    /// Bedrock API key. Only Bedrock accepts it.
    Bearer(String),
    SigV4(SigV4Signer),
}

impl Auth {
    /// Signed requests whenever an access key pair exists. Without one, the Bedrock API key
    /// is used for Bedrock services only; other services go out unauthenticated.
    pub fn for_service(
        credentials: Option<&AwsCredentials>,
        api_key: Option<&str>,
        region: &str,
        service: &str,
    ) -> Self {
        match (credentials, api_key) {
            (Some(credentials), _) => {
                Auth::SigV4(SigV4Signer::new(credentials.clone(), region, service))
            }
            (None, Some(key)) if service == BEDROCK_SERVICE && !key.is_empty() => {
                Auth::Bearer(key.to_string())
            }
            _ => Auth::Anonymous,
        }
    }

    fn apply(&self, request: &mut Request) -> Result<(), BackendFailure> {
        match self {
            Auth::Anonymous => Ok(()),
            Auth::Bearer(key) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", key))
                    .map_err(|e| BackendFailure::Transport(format!("invalid API key: {}", e)))?;
                request.headers_mut().insert(AUTHORIZATION, value);
                Ok(())
            }
            Auth::SigV4(signer) => signer
                .sign(request)
                .map_err(|e| BackendFailure::Transport(format!("signing failed: {}", e))),
        }
    }
}

/// Thin authenticated client bound to one service endpoint.
#[derive(Clone)]
pub struct ServiceClient {
    client: reqwest::Client,
    base_url: String,
    auth: Auth,
}

impl ServiceClient {
    /// `base_url` without trailing slash, e.g. `https://bedrock-agent-runtime.us-west-2.amazonaws.com`.
    pub fn new(base_url: impl Into<String>, auth: Auth) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request to `{base_url}{path}` with JSON accept set. Authentication is added by `send`.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Accept", "application/json")
    }

    /// Authenticate and send. Any status is returned as-is.
    pub async fn send(&self, req: RequestBuilder) -> Result<Response, BackendFailure> {
        let mut request = req
            .build()
            .map_err(|e| BackendFailure::Transport(format!("invalid request: {}", e)))?;
        self.auth.apply(&mut request)?;
        self.client
            .execute(request)
            .await
            .map_err(|e| BackendFailure::Transport(format!("HTTP request failed: {}", e)))
    }

    /// Send and decode a JSON body, mapping every failure into `BackendFailure`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<T, BackendFailure> {
        let response = self.send(req).await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BackendFailure::Transport(format!("Failed to parse response: {}", e)))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "Message")]
    message: Option<String>,
    #[serde(rename = "__type")]
    error_type: Option<String>,
}

/// Turn a failed response into a structured error when the envelope allows it.
pub async fn error_from_response(response: Response) -> BackendFailure {
    let status = response.status();
    let header_code = response
        .headers()
        .get(ERROR_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let text = response.text().await.unwrap_or_default();
    warn!(status = %status, body = %text.chars().take(200).collect::<String>(), "service returned error");
    parse_error(status.as_u16(), header_code.as_deref(), &text)
}

/// Build a `BackendFailure` from status, error-type header and body text.
///
/// The code comes from the header (text before `:`) or the body `__type` (text after `#`).
/// Without a code or a JSON message the failure is a transport failure.
pub fn parse_error(status: u16, header_code: Option<&str>, body: &str) -> BackendFailure {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();

    let code = header_code
        .map(|h| h.split(':').next().unwrap_or(h).trim().to_string())
        .filter(|c| !c.is_empty())
        .or_else(|| {
            parsed
                .as_ref()
                .and_then(|b| b.error_type.as_deref())
                .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
        });
    let message = parsed.and_then(|b| b.message);

    match (code, message) {
        (Some(code), Some(message)) => BackendFailure::Service(BackendError::new(code, message)),
        (Some(code), None) => BackendFailure::Service(BackendError::new(code, body.trim())),
        (None, _) => BackendFailure::Transport(format!(
            "API error {}: {}",
            status,
            body.chars().take(200).collect::<String>()
        )),
    }
}
