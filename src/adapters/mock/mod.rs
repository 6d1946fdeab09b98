//! Offline adapters. Used when no API key is configured, and in tests.

pub mod mock_adapter;

pub use mock_adapter::{
    MockBlobStore, MockChatModel, MockFunction, MockKnowledgeBaseAdmin, MockRetrievalAdapter,
};
