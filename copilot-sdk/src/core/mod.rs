//! Core abstractions for the Copilot SDK
//!
//! - `ServiceClient`: identity of every backend client
//! - `AuthenticatedClient`: credential handling
//! - `ChatModel`: chat completion, atomic or streamed
//! - `Embedder`: dense text embeddings
//!
//! Callers depend on `ChatModel` and `Embedder` rather than on a concrete
//! client so pipelines can be exercised against scripted models.

mod chat;

pub use chat::{
    ChatMessage, Completion, CompletionChunk, CompletionStream, ResponseFormat, Role, Usage,
};

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::error::Result;

/// Base trait for all service clients
pub trait ServiceClient: Send + Sync {
    /// The client name, also used as the service tag on errors
    fn name(&self) -> &str;

    /// The base URL for the service
    fn base_url(&self) -> &str;
}

/// Trait for clients that require authentication
pub trait AuthenticatedClient: Send + Sync {
    /// Authentication scheme (e.g., "Bearer", "token", "api-key")
    fn auth_type(&self) -> &str;

    /// Check if credentials are present
    fn is_authenticated(&self) -> bool;

    /// Add authentication headers to a request.
    ///
    /// Fails with an authentication error when no credential is configured,
    /// so nothing is sent without one.
    fn apply_auth(&self, headers: &mut HeaderMap) -> Result<()>;
}

/// A chat-completion backend
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Request a complete reply
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        format: ResponseFormat,
    ) -> Result<Completion>;

    /// Request a reply delivered as a stream of fragments
    async fn complete_streaming(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<CompletionStream>;
}

/// A text-embedding backend
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>>;
}
