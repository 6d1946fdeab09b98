//! kb-chat: knowledge-base grounded chat over a hosted LLM, with Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
