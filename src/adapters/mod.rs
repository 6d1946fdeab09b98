//! Infrastructure adapters. Implement outbound ports.
//!
//! AWS services over HTTP, offline mocks, timer, terminal UI. Map errors to DomainError.

pub mod aws;
pub mod clock;
pub mod mock;
pub mod ui;
