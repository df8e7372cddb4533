//! Per-request access to the chat model
//!
//! A [`ModelSession`] binds a [`ChatModel`] to one model id and one
//! cancellation token, and accumulates the token usage of every call made
//! through it. Each pipeline stage borrows the same session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use copilot_sdk::core::{ChatMessage, ChatModel, ResponseFormat, Usage};
use futures::StreamExt;
use log::debug;
use tokio_util::sync::CancellationToken;

use crate::error::{FixError, Result};
use crate::sink::OutputSink;
use crate::types::TokenUsage;

pub struct ModelSession {
    model: Arc<dyn ChatModel>,
    model_id: String,
    cancel: CancellationToken,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    calls: AtomicU64,
}

impl ModelSession {
    pub fn new(model: Arc<dyn ChatModel>, model_id: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            model,
            model_id: model_id.into(),
            cancel,
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
            calls: AtomicU64::new(0),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fail with [`FixError::Cancelled`] once the token has fired
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(FixError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// One complete reply. The in-flight request is dropped if the token
    /// fires first.
    pub async fn complete(&self, messages: &[ChatMessage], format: ResponseFormat) -> Result<String> {
        self.ensure_active()?;
        self.calls.fetch_add(1, Ordering::Relaxed);

        let completion = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(FixError::Cancelled),
            result = self.model.complete(&self.model_id, messages, format) => result?,
        };

        self.record(completion.usage);
        debug!(
            "Model {} replied with {} chars ({} prompt / {} completion tokens)",
            self.model_id,
            completion.text.len(),
            completion.usage.prompt_tokens,
            completion.usage.completion_tokens
        );
        Ok(completion.text)
    }

    /// A streamed reply. Each fragment is forwarded to `sink` as it
    /// arrives; the concatenation is returned.
    pub async fn stream_to(&self, messages: &[ChatMessage], sink: &dyn OutputSink) -> Result<String> {
        self.ensure_active()?;
        self.calls.fetch_add(1, Ordering::Relaxed);

        let mut stream = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(FixError::Cancelled),
            result = self.model.complete_streaming(&self.model_id, messages) => result?,
        };

        let mut answer = String::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(FixError::Cancelled),
                next = stream.next() => next,
            };

            let Some(chunk) = next else { break };
            let chunk = chunk?;
            if let Some(usage) = chunk.usage {
                self.record(usage);
            }
            if !chunk.text.is_empty() {
                sink.markdown(&chunk.text);
                answer.push_str(&chunk.text);
            }
        }

        Ok(answer)
    }

    /// Usage accumulated so far
    pub fn usage(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
        }
    }

    /// Number of model calls started through this session
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn record(&self, usage: Usage) {
        self.prompt_tokens.fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens.fetch_add(usage.completion_tokens, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for ModelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSession")
            .field("model_id", &self.model_id)
            .field("usage", &self.usage())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
