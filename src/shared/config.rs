//! Application configuration. Credentials, endpoints, knowledge base, retry bounds.

use crate::domain::{DEFAULT_MAX_RETRIES, RetryPolicy};
use serde::Deserialize;

pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_INFERENCE_PROFILE_ID: &str = "us.anthropic.claude-3-7-sonnet-20250219-v1:0";

/// Static AWS credentials used to sign requests.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// AWS region. Read from KB_CHAT_REGION or AWS_REGION.
    #[serde(default)]
    pub region: Option<String>,

    /// Bedrock API key sent as a bearer token. Read from KB_CHAT_API_KEY or AWS_BEARER_TOKEN_BEDROCK.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Access key for SigV4 signing. Read from KB_CHAT_ACCESS_KEY_ID or AWS_ACCESS_KEY_ID.
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Secret for SigV4 signing. Read from KB_CHAT_SECRET_ACCESS_KEY or AWS_SECRET_ACCESS_KEY.
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Optional session token. Read from KB_CHAT_SESSION_TOKEN or AWS_SESSION_TOKEN.
    #[serde(default)]
    pub session_token: Option<String>,

    /// Knowledge base to ground answers in. Read from KB_CHAT_KNOWLEDGE_BASE_ID or BEDROCK_KNOWLEDGE_BASE_ID.
    #[serde(default)]
    pub knowledge_base_id: Option<String>,

    /// Model id / inference profile used for generation. Read from KB_CHAT_INFERENCE_PROFILE_ID
    /// or BEDROCK_INFERENCE_PROFILE_ID.
    #[serde(default)]
    pub inference_profile_id: Option<String>,

    /// "kb" (default) or "direct". Read from KB_CHAT_MODE.
    #[serde(default)]
    pub mode: Option<String>,

    /// Max retries on knowledge-base auto-pause (default 10). Read from KB_CHAT_MAX_RETRIES.
    #[serde(default)]
    pub max_retries: Option<u32>,

    /// Optional password gate for the chat. Read from KB_CHAT_APP_PASSWORD.
    #[serde(default)]
    pub app_password: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Endpoint overrides (local gateways, tests)
    // ─────────────────────────────────────────────────────────────────────────
    /// Bedrock runtime endpoint override. Read from KB_CHAT_RUNTIME_ENDPOINT.
    #[serde(default)]
    pub runtime_endpoint: Option<String>,

    /// Bedrock agent runtime endpoint override. Read from KB_CHAT_AGENT_RUNTIME_ENDPOINT.
    #[serde(default)]
    pub agent_runtime_endpoint: Option<String>,

    /// Bedrock agent (control plane) endpoint override. Read from KB_CHAT_AGENT_ENDPOINT.
    #[serde(default)]
    pub agent_endpoint: Option<String>,

    /// S3 endpoint override. Read from KB_CHAT_S3_ENDPOINT.
    #[serde(default)]
    pub s3_endpoint: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Collaborators
    // ─────────────────────────────────────────────────────────────────────────
    /// Bucket listed by the /files command. Read from KB_CHAT_S3_BUCKET.
    #[serde(default)]
    pub s3_bucket: Option<String>,

    /// Default prefix for /files. Read from KB_CHAT_S3_PREFIX.
    #[serde(default)]
    pub s3_prefix: Option<String>,

    /// Function URL called by /invoke. Read from KB_CHAT_FUNCTION_URL.
    #[serde(default)]
    pub function_url: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("KB_CHAT"));
        if let Ok(path) = std::env::var("KB_CHAT_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    /// Returns the region. Falls back to AWS_REGION, then us-west-2.
    pub fn region_or_default(&self) -> String {
        self.region
            .clone()
            .or_else(|| std::env::var("AWS_REGION").ok())
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    /// Returns the API key if configured. Falls back to AWS_BEARER_TOKEN_BEDROCK.
    pub fn api_key(&self) -> Option<String> {
        setting(&self.api_key, "AWS_BEARER_TOKEN_BEDROCK")
    }

    /// Access key pair (plus session token) when both halves are configured.
    /// Falls back to AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY and AWS_SESSION_TOKEN.
    pub fn aws_credentials(&self) -> Option<AwsCredentials> {
        let access_key_id = setting(&self.access_key_id, "AWS_ACCESS_KEY_ID")?;
        let secret_access_key = setting(&self.secret_access_key, "AWS_SECRET_ACCESS_KEY")?;
        Some(AwsCredentials {
            access_key_id,
            secret_access_key,
            session_token: setting(&self.session_token, "AWS_SESSION_TOKEN"),
        })
    }

    /// Returns true if real AWS adapters can be used.
    pub fn is_aws_configured(&self) -> bool {
        self.api_key().is_some() || self.aws_credentials().is_some()
    }

    pub fn knowledge_base_id(&self) -> Option<String> {
        setting(&self.knowledge_base_id, "BEDROCK_KNOWLEDGE_BASE_ID")
    }

    pub fn inference_profile_id_or_default(&self) -> String {
        self.inference_profile_id
            .clone()
            .or_else(|| std::env::var("BEDROCK_INFERENCE_PROFILE_ID").ok())
            .unwrap_or_else(|| DEFAULT_INFERENCE_PROFILE_ID.to_string())
    }

    pub fn mode_or_default(&self) -> String {
        self.mode.clone().unwrap_or_else(|| "kb".to_string())
    }

    /// Retry policy for chat answers (`2^n + 1` seconds between attempts).
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Endpoint helpers
    // ─────────────────────────────────────────────────────────────────────────

    pub fn runtime_endpoint(&self) -> String {
        self.runtime_endpoint
            .clone()
            .unwrap_or_else(|| service_endpoint("bedrock-runtime", &self.region_or_default()))
    }

    pub fn agent_runtime_endpoint(&self) -> String {
        self.agent_runtime_endpoint.clone().unwrap_or_else(|| {
            service_endpoint("bedrock-agent-runtime", &self.region_or_default())
        })
    }

    pub fn agent_endpoint(&self) -> String {
        self.agent_endpoint
            .clone()
            .unwrap_or_else(|| service_endpoint("bedrock-agent", &self.region_or_default()))
    }

    pub fn s3_endpoint(&self) -> String {
        self.s3_endpoint
            .clone()
            .unwrap_or_else(|| service_endpoint("s3", &self.region_or_default()))
    }

    pub fn s3_prefix_or_default(&self) -> String {
        self.s3_prefix.clone().unwrap_or_default()
    }
}

/// Configured value, else the named environment variable. Empty counts as unset.
fn setting(value: &Option<String>, env_var: &str) -> Option<String> {
    value
        .clone()
        .or_else(|| std::env::var(env_var).ok())
        .filter(|v| !v.is_empty())
}

/// Regional endpoint, e.g. `https://bedrock-runtime.us-west-2.amazonaws.com`.
fn service_endpoint(service: &str, region: &str) -> String {
    format!("https://{}.{}.amazonaws.com", service, region)
}
