//! AWS service adapters over plain HTTPS + JSON.
//!
//! Requests are SigV4-signed when an access key pair is configured; otherwise Bedrock
//! calls fall back to the Bedrock API key. Endpoints are injected, so a local gateway
//! or test server can stand in for the real service.

pub mod agent;
pub mod agent_runtime;
pub mod http;
pub mod lambda;
pub mod runtime;
pub mod s3;
pub mod sigv4;

pub use agent::AgentAdminAdapter;
pub use agent_runtime::AgentRuntimeAdapter;
pub use http::{Auth, BEDROCK_SERVICE, LAMBDA_SERVICE, S3_SERVICE, ServiceClient};
pub use lambda::LambdaAdapter;
pub use runtime::RuntimeModelAdapter;
pub use s3::S3Adapter;
pub use sigv4::SigV4Signer;
