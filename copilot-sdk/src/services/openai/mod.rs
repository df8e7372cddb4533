//! Chat-completion and embedding client
//!
//! Speaks both the OpenAI and the Azure OpenAI dialects of the
//! chat-completions API, including SSE streaming.

mod models;
mod stream;

pub use models::*;
pub use stream::{SseDecoder, SseEvent};

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{ApiFlavor, ConfigProvider, LanguageModelConfig, ServiceConfig};
use crate::core::{
    AuthenticatedClient, ChatMessage, ChatModel, Completion, CompletionStream, Embedder,
    ResponseFormat, ServiceClient,
};
use crate::error::{ErrorDetails, Result, ServiceError};
use crate::resilience::{CircuitBreakerConfig, Resilience, RetryConfig};
use crate::services::common::{build_http_client, parse_error_response, read_json, UserAgent};
use crate::util::sanitize_for_logging;

const SERVICE: &str = "openai";

/// Sampling parameters used for every completion
const TEMPERATURE: f32 = 0.5;
const TOP_P: f32 = 0.95;

/// Client for an OpenAI-compatible or Azure OpenAI endpoint
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    http_client: Client,
    config: LanguageModelConfig,
    resilience: Resilience,
}

impl OpenAIClient {
    pub fn new(config: LanguageModelConfig) -> Result<Self> {
        config.validate()?;

        let http_client = build_http_client(
            UserAgent::for_client("openai"),
            Duration::from_secs(config.timeout_seconds),
        )?;

        let resilience = Resilience::new(
            SERVICE,
            RetryConfig {
                max_retries: 3,
                initial_interval: Duration::from_millis(500),
                max_interval: Duration::from_secs(10),
                ..RetryConfig::default()
            },
            CircuitBreakerConfig {
                failure_threshold: 5,
                reset_timeout: Duration::from_secs(60),
                ..CircuitBreakerConfig::default()
            },
        );

        Ok(Self {
            http_client,
            config,
            resilience,
        })
    }

    /// Build a client from configuration keys (`llm_*`)
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        Self::new(LanguageModelConfig::from_provider(provider)?)
    }

    /// Replace the retry and circuit-breaker policies
    pub fn with_resilience(mut self, resilience: Resilience) -> Self {
        self.resilience = resilience;
        self
    }

    pub fn config(&self) -> &LanguageModelConfig {
        &self.config
    }

    /// URL of `operation` (`chat/completions`, `embeddings`) for `model`
    pub fn endpoint(&self, model: &str, operation: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match self.config.flavor {
            ApiFlavor::OpenAI => format!("{}/{}", base, operation),
            ApiFlavor::Azure => format!(
                "{}/openai/deployments/{}/{}?api-version={}",
                base, model, operation, self.config.api_version
            ),
        }
    }

    /// Model name carried in the body; Azure routes by deployment instead
    fn body_model(&self, model: &str) -> Option<String> {
        match self.config.flavor {
            ApiFlavor::OpenAI => Some(model.to_string()),
            ApiFlavor::Azure => None,
        }
    }

    /// Send a chat completion request
    pub async fn chat_completion(
        &self,
        model: &str,
        mut request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        request.model = self.body_model(model);
        request.stream = None;
        request.stream_options = None;
        let url = self.endpoint(model, "chat/completions");
        self.resilience.execute(|| self.post_json(&url, &request)).await
    }

    /// Send a streaming chat completion request.
    ///
    /// Retries only cover establishing the stream; a failure after the
    /// first fragment is surfaced through the stream itself.
    pub async fn chat_completion_stream(
        &self,
        model: &str,
        mut request: ChatCompletionRequest,
    ) -> Result<CompletionStream> {
        request.model = self.body_model(model);
        request.stream = Some(true);
        request.stream_options = Some(StreamOptions { include_usage: true });
        let url = self.endpoint(model, "chat/completions");
        let (url, request) = (url.as_str(), &request);

        let response = self
            .resilience
            .execute(move || async move {
                let response = self.post(url, request).await?;
                if response.status().is_success() {
                    Ok(response)
                } else {
                    Err(parse_error_response(SERVICE, url, response).await)
                }
            })
            .await?;

        Ok(stream::completion_stream(response))
    }

    /// Send a text embedding request
    pub async fn embeddings(&self, model: &str, input: &str) -> Result<EmbeddingResponse> {
        let request = EmbeddingRequest {
            model: self.body_model(model),
            input: input.to_string(),
        };
        let url = self.endpoint(model, "embeddings");
        self.resilience.execute(|| self.post_json(&url, &request)).await
    }

    async fn post<T: Serialize>(&self, url: &str, body: &T) -> Result<reqwest::Response> {
        let mut headers = HeaderMap::new();
        self.apply_auth(&mut headers)?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        debug!("Sending request to language model: POST {}", sanitize_for_logging(url));

        Ok(self
            .http_client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?)
    }

    async fn post_json<T: Serialize, R: DeserializeOwned>(&self, url: &str, body: &T) -> Result<R> {
        let response = self.post(url, body).await?;
        read_json(SERVICE, url, response).await
    }

    fn request_for(messages: &[ChatMessage], format: ResponseFormat) -> ChatCompletionRequest {
        ChatCompletionRequest {
            messages: messages.to_vec(),
            temperature: Some(TEMPERATURE),
            top_p: Some(TOP_P),
            response_format: WireResponseFormat::from_format(format),
            ..ChatCompletionRequest::default()
        }
    }
}

impl ServiceClient for OpenAIClient {
    fn name(&self) -> &str {
        SERVICE
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

impl AuthenticatedClient for OpenAIClient {
    fn auth_type(&self) -> &str {
        match self.config.flavor {
            ApiFlavor::OpenAI => "Bearer",
            ApiFlavor::Azure => "api-key",
        }
    }

    fn is_authenticated(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    fn apply_auth(&self, headers: &mut HeaderMap) -> Result<()> {
        if !self.is_authenticated() {
            return Err(ServiceError::authentication("No API key set for language model client")
                .with_context(ErrorDetails::for_service(SERVICE)));
        }

        let (name, value) = match self.config.flavor {
            ApiFlavor::OpenAI => ("authorization", format!("Bearer {}", self.config.api_key)),
            ApiFlavor::Azure => ("api-key", self.config.api_key.clone()),
        };

        let value = HeaderValue::from_str(&value)
            .map_err(|_| ServiceError::configuration("API key contains invalid header characters"))?;
        headers.insert(name, value);
        Ok(())
    }
}

#[async_trait]
impl ChatModel for OpenAIClient {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        format: ResponseFormat,
    ) -> Result<Completion> {
        let response = self
            .chat_completion(model, Self::request_for(messages, format))
            .await?;

        Ok(Completion {
            text: response.first_content().to_string(),
            usage: response.usage.unwrap_or_default(),
        })
    }

    async fn complete_streaming(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<CompletionStream> {
        self.chat_completion_stream(model, Self::request_for(messages, ResponseFormat::Text))
            .await
    }
}

#[async_trait]
impl Embedder for OpenAIClient {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let response = self.embeddings(model, text).await?;
        response
            .data
            .into_iter()
            .next()
            .map(|embedding| embedding.embedding)
            .ok_or_else(|| ServiceError::parsing("No embeddings returned"))
    }
}
