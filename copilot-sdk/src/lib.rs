//! # Copilot SDK
//!
//! Typed clients for the backends the fix assistant talks to.
//!
//! This crate provides:
//!
//! - Core abstractions (`ChatModel`, `Embedder`) that pipelines depend on
//! - Clients for OpenAI / Azure OpenAI, GitHub REST and Azure AI Search
//! - An error taxonomy shared by every client
//! - Resilience patterns (retries, circuit breakers, bulkheads)
//! - Configuration providers

pub mod core;
pub use core::{
    AuthenticatedClient, ChatMessage, ChatModel, Completion, CompletionChunk, CompletionStream,
    Embedder, ResponseFormat, Role, ServiceClient, Usage,
};

pub mod services;
pub use services::{azure_search, github, openai};

pub mod error;
pub use error::{ErrorDetails, Result, ServiceError};

pub mod resilience;
pub use resilience::{Bulkhead, CircuitBreaker, Resilience, RetryExecutor};

pub mod config;
pub use config::{ConfigProvider, ConfigProviderExt, ServiceConfig};

pub mod util;

#[cfg(test)]
mod tests;
