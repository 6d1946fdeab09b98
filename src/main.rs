//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use dotenv::dotenv;
use kb_chat::adapters::aws::{
    AgentAdminAdapter, AgentRuntimeAdapter, Auth, BEDROCK_SERVICE, LAMBDA_SERVICE,
    LambdaAdapter, RuntimeModelAdapter, S3Adapter, S3_SERVICE, ServiceClient,
};
use kb_chat::adapters::clock::TokioSleeper;
use kb_chat::adapters::mock::{
    MockBlobStore, MockChatModel, MockFunction, MockKnowledgeBaseAdmin, MockRetrievalAdapter,
};
use kb_chat::adapters::ui::tui::TuiInputPort;
use kb_chat::ports::{
    BlobStorePort, ChatModelPort, FunctionPort, InputPort, KnowledgeBaseAdminPort, RetrievalPort,
    Sleeper,
};
use kb_chat::shared::config::AppConfig;
use kb_chat::usecases::{ChatMode, ChatService, KnowledgeBaseAdminService, ResilientRetrievalClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Knowledge base id used by the offline adapters when none is configured.
const MOCK_KNOWLEDGE_BASE_ID: &str = "MOCK-KB";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    kb_chat::adapters::ui::init_ui();

    let cfg = AppConfig::load().map_err(|e| anyhow::anyhow!("config: {}", e))?;

    let mode_name = cfg.mode_or_default();
    let mode = ChatMode::from_str(&mode_name)
        .ok_or_else(|| anyhow::anyhow!("Unknown KB_CHAT_MODE '{}': use 'kb' or 'direct'", mode_name))?;
    let model_id = cfg.inference_profile_id_or_default();
    let retry_policy = cfg.retry_policy();

    // --- Outbound adapters: real AWS when credentials or an API key are present, mocks otherwise ---
    let retrieval_port: Arc<dyn RetrievalPort>;
    let model_port: Arc<dyn ChatModelPort>;
    let admin_port: Arc<dyn KnowledgeBaseAdminPort>;
    let blob_store: Arc<dyn BlobStorePort>;
    let knowledge_base_id: Option<String>;

    let region = cfg.region_or_default();
    let credentials = cfg.aws_credentials();
    let api_key = cfg.api_key();
    let auth_for = |service: &str| {
        Auth::for_service(credentials.as_ref(), api_key.as_deref(), &region, service)
    };

    if cfg.is_aws_configured() {
        info!(
            region = %region,
            model = %model_id,
            signed = credentials.is_some(),
            "using Bedrock adapters"
        );
        if credentials.is_none() && cfg.s3_bucket.is_some() {
            warn!("AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY not set, S3 requests go out unsigned");
        }
        retrieval_port = Arc::new(AgentRuntimeAdapter::new(ServiceClient::new(
            cfg.agent_runtime_endpoint(),
            auth_for(BEDROCK_SERVICE),
        )));
        model_port = Arc::new(RuntimeModelAdapter::new(
            ServiceClient::new(cfg.runtime_endpoint(), auth_for(BEDROCK_SERVICE)),
            model_id.clone(),
        ));
        admin_port = Arc::new(AgentAdminAdapter::new(ServiceClient::new(
            cfg.agent_endpoint(),
            auth_for(BEDROCK_SERVICE),
        )));
        blob_store = Arc::new(S3Adapter::new(ServiceClient::new(
            cfg.s3_endpoint(),
            auth_for(S3_SERVICE),
        )));
        knowledge_base_id = cfg.knowledge_base_id();
    } else {
        warn!("no AWS credentials or Bedrock API key set, using mock adapters");
        let kb_id = cfg
            .knowledge_base_id()
            .unwrap_or_else(|| MOCK_KNOWLEDGE_BASE_ID.to_string());
        retrieval_port = Arc::new(MockRetrievalAdapter::new());
        model_port = Arc::new(MockChatModel::new());
        admin_port = Arc::new(MockKnowledgeBaseAdmin::new(kb_id.clone()));
        blob_store = Arc::new(MockBlobStore::new(vec![
            "documents/handbook.pdf".to_string(),
            "documents/faq.md".to_string(),
        ]));
        knowledge_base_id = Some(kb_id);
    }

    if mode == ChatMode::KnowledgeBase && knowledge_base_id.is_none() {
        anyhow::bail!(
            "Set BEDROCK_KNOWLEDGE_BASE_ID (or KB_CHAT_KNOWLEDGE_BASE_ID), or use KB_CHAT_MODE=direct"
        );
    }

    let function: Option<Arc<dyn FunctionPort>> = match &cfg.function_url {
        Some(url) => Some(Arc::new(LambdaAdapter::new(ServiceClient::new(
            url.clone(),
            auth_for(LAMBDA_SERVICE),
        )))),
        None if !cfg.is_aws_configured() => Some(Arc::new(MockFunction)),
        None => None,
    };

    // --- Services ---
    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
    let retrieval = Arc::new(ResilientRetrievalClient::new(
        retrieval_port,
        Arc::clone(&sleeper),
    ));
    info!(
        mode = ?mode,
        max_retries = retry_policy.max_attempts,
        "chat service ready"
    );
    let chat = Arc::new(ChatService::new(
        mode,
        retrieval,
        model_port,
        knowledge_base_id.clone().unwrap_or_default(),
        model_id,
        retry_policy,
    ));
    let admin = Arc::new(KnowledgeBaseAdminService::new(admin_port, sleeper));

    let input_port: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(
        chat,
        admin,
        blob_store,
        function,
        knowledge_base_id,
        cfg.s3_bucket.clone(),
        cfg.s3_prefix_or_default(),
        cfg.app_password.clone(),
    ));

    // --- Run (password gate -> chat loop) ---
    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
