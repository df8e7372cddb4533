//! Pipeline settings
//!
//! Loaded from any [`ConfigProvider`]; the binaries use the environment
//! provider, so `chat_model` is read from `TEAMSFX_FIX_CHAT_MODEL`.

use copilot_sdk::config::{ConfigProvider, ConfigProviderExt, ServiceConfig};
use copilot_sdk::error::{Result, ServiceError};
use serde::{Deserialize, Serialize};

use crate::rerank::MAX_SCORE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Chat model (deployment name for Azure OpenAI)
    pub chat_model: String,

    pub embedding_model: String,

    /// Repository searched for issues, as `owner/name`
    pub repository: String,

    /// Lines of the output log given to the model
    pub log_tail_lines: usize,

    /// Minimum relevance score a candidate needs to be kept
    pub rerank_threshold: u8,

    /// Upper bound on concurrent calls in each fan-out
    pub max_concurrency: usize,

    /// Stream the answer as it is generated
    pub streaming: bool,

    pub github_rest_limit: Option<usize>,
    pub github_vector_limit: Option<usize>,
    pub stack_overflow_limit: Option<usize>,

    /// Output log of the host tool, if there is one
    pub output_log_path: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chat_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-large".to_string(),
            repository: "OfficeDev/teams-toolkit".to_string(),
            log_tail_lines: 100,
            rerank_threshold: 1,
            max_concurrency: 8,
            streaming: true,
            github_rest_limit: None,
            github_vector_limit: None,
            stack_overflow_limit: None,
            output_log_path: None,
        }
    }
}

fn optional_limit<P: ConfigProvider + ?Sized>(provider: &P, key: &str) -> Result<Option<usize>> {
    match provider.get_string(key) {
        Ok(_) => {
            let value = provider.get_int(key)?;
            usize::try_from(value)
                .map(Some)
                .map_err(|_| ServiceError::configuration(format!("{} must not be negative", key)))
        }
        Err(_) => Ok(None),
    }
}

impl PipelineConfig {
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();
        let output_log_path = provider
            .get_string("output_log_path")
            .ok()
            .filter(|p| !p.trim().is_empty());

        let config = Self {
            chat_model: provider.get_string_or("chat_model", &defaults.chat_model),
            embedding_model: provider.get_string_or("embedding_model", &defaults.embedding_model),
            repository: provider.get_string_or("repository", &defaults.repository),
            log_tail_lines: provider.get_int_or("log_tail_lines", defaults.log_tail_lines as i64).max(0)
                as usize,
            rerank_threshold: provider
                .get_int_or("rerank_threshold", defaults.rerank_threshold as i64)
                .clamp(0, u8::MAX as i64) as u8,
            max_concurrency: provider.get_int_or("max_concurrency", defaults.max_concurrency as i64).max(0)
                as usize,
            streaming: provider.get_bool_or("streaming", defaults.streaming),
            github_rest_limit: optional_limit(provider, "github_rest_limit")?,
            github_vector_limit: optional_limit(provider, "github_vector_limit")?,
            stack_overflow_limit: optional_limit(provider, "stack_overflow_limit")?,
            output_log_path,
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for PipelineConfig {
    fn validate(&self) -> Result<()> {
        if self.chat_model.trim().is_empty() {
            return Err(ServiceError::configuration("Chat model is required"));
        }

        if self.embedding_model.trim().is_empty() {
            return Err(ServiceError::configuration("Embedding model is required"));
        }

        if !self.repository.contains('/') {
            return Err(ServiceError::configuration(format!(
                "Repository must be owner/name, got '{}'",
                self.repository
            )));
        }

        if self.rerank_threshold > MAX_SCORE {
            return Err(ServiceError::configuration(format!(
                "Rerank threshold {} is above the maximum score {}",
                self.rerank_threshold, MAX_SCORE
            )));
        }

        if self.max_concurrency == 0 {
            return Err(ServiceError::configuration("Max concurrency must be at least 1"));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "fix_pipeline"
    }
}
