//! Configuration management for service clients
//!
//! This module provides utilities for loading and validating configuration
//! for the backend clients, with support for environment variables.

use std::collections::HashMap;
use std::env;
use std::fmt::{self, Debug};
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value
            .trim()
            .parse::<i64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid integer for key {}: {}", key, e)))
    }

    /// Get a boolean configuration value
    fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.get_string(key)?;
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(ServiceError::configuration(format!(
                "Invalid boolean value for key {}: {}",
                key, value
            ))),
        }
    }

    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    fn get_int_or(&self, key: &str, default: i64) -> i64 {
        self.get_int(key).unwrap_or(default)
    }

    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

impl<T: ConfigProvider + ?Sized> ConfigProvider for Arc<T> {
    fn get_string(&self, key: &str) -> Result<String> {
        (**self).get_string(key)
    }
}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,

    /// Optional namespace for variables (e.g., "GITHUB", "SEARCH")
    namespace: Option<String>,
}

impl EnvConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Format a configuration key as an environment variable name
    pub(crate) fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        if let Some(ref namespace) = self.namespace {
            env_key.push_str(namespace);
            env_key.push('_');
        }

        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => {
                ServiceError::configuration(format!("Environment variable not set: {}", env_key))
            }
            env::VarError::NotUnicode(_) => ServiceError::configuration(format!(
                "Environment variable is not valid unicode: {}",
                env_key
            )),
        })
    }
}

/// In-memory config provider for tests or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::configuration(format!("Configuration key not found: {}", key)))
    }
}

/// A composite config provider that tries multiple providers in order
pub struct CompositeConfigProvider {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl Default for CompositeConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeConfigProvider {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Add a provider to the end of the chain
    pub fn add_provider(&mut self, provider: impl ConfigProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    pub fn with_provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.add_provider(provider);
        self
    }
}

impl Debug for CompositeConfigProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeConfigProvider")
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl ConfigProvider for CompositeConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        for provider in &self.providers {
            if let Ok(value) = provider.get_string(key) {
                return Ok(value);
            }
        }

        Err(ServiceError::configuration(format!(
            "Configuration key not found in any provider: {}",
            key
        )))
    }
}

/// Default configuration provider: environment variables prefixed `TEAMSFX_FIX_`
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> =
    Lazy::new(|| Arc::new(EnvConfigProvider::new().with_prefix("TEAMSFX_FIX")));

/// Trait for service-specific configuration
pub trait ServiceConfig: Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Service name
    fn service_name(&self) -> &str;
}

fn validate_url(what: &str, value: &str) -> Result<()> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| ServiceError::configuration(format!("Invalid {} '{}': {}", what, value, e)))
}

/// Which wire dialect a chat-completion endpoint speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiFlavor {
    /// `POST {base}/chat/completions`, model in the body, Bearer key
    OpenAI,
    /// `POST {endpoint}/openai/deployments/{deployment}/...?api-version=`, `api-key` header
    Azure,
}

impl FromStr for ApiFlavor {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ApiFlavor::OpenAI),
            "azure" | "azure_openai" | "azure-openai" => Ok(ApiFlavor::Azure),
            other => Err(ServiceError::configuration(format!("Unknown API flavor: {}", other))),
        }
    }
}

/// Configuration for the chat-completion / embedding endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageModelConfig {
    pub flavor: ApiFlavor,

    pub api_key: String,

    /// Base URL (OpenAI flavour) or resource endpoint (Azure flavour)
    pub base_url: String,

    /// Only sent by the Azure flavour
    pub api_version: String,

    pub timeout_seconds: u64,
}

impl Default for LanguageModelConfig {
    fn default() -> Self {
        Self {
            flavor: ApiFlavor::Azure,
            api_key: String::new(),
            base_url: String::new(),
            api_version: "2024-05-01-preview".to_string(),
            timeout_seconds: 60,
        }
    }
}

impl LanguageModelConfig {
    /// Load configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();
        let flavor = match provider.get_string("llm_flavor") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.flavor,
        };

        let config = Self {
            flavor,
            api_key: provider.get_string("llm_api_key")?,
            base_url: provider.get_string("llm_endpoint")?,
            api_version: provider.get_string_or("llm_api_version", &defaults.api_version),
            timeout_seconds: provider.get_int_or("llm_timeout_seconds", defaults.timeout_seconds as i64)
                as u64,
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for LanguageModelConfig {
    fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ServiceError::configuration("Language model API key is required"));
        }

        if self.base_url.is_empty() {
            return Err(ServiceError::configuration("Language model endpoint is required"));
        }

        validate_url("language model endpoint", &self.base_url)?;

        if self.flavor == ApiFlavor::Azure && self.api_version.is_empty() {
            return Err(ServiceError::configuration("Azure OpenAI API version is required"));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "openai"
    }
}

/// Configuration for the GitHub REST API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Personal access token; checked when a request is made
    pub token: String,

    pub base_url: String,

    pub timeout_seconds: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: "https://api.github.com".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl GithubConfig {
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            token: provider.get_string_or("github_token", ""),
            base_url: provider.get_string_or("github_base_url", &defaults.base_url),
            timeout_seconds: provider
                .get_int_or("github_timeout_seconds", defaults.timeout_seconds as i64)
                as u64,
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for GithubConfig {
    fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ServiceError::configuration("GitHub base URL is required"));
        }
        validate_url("GitHub base URL", &self.base_url)
    }

    fn service_name(&self) -> &str {
        "github"
    }
}

/// Configuration for Azure AI Search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureSearchConfig {
    pub endpoint: String,

    pub api_key: String,

    pub api_version: String,

    pub timeout_seconds: u64,
}

impl Default for AzureSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            api_version: "2024-07-01".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl AzureSearchConfig {
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            endpoint: provider.get_string("azure_search_endpoint")?,
            api_key: provider.get_string("azure_search_api_key")?,
            api_version: provider.get_string_or("azure_search_api_version", &defaults.api_version),
            timeout_seconds: provider
                .get_int_or("azure_search_timeout_seconds", defaults.timeout_seconds as i64)
                as u64,
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for AzureSearchConfig {
    fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(ServiceError::configuration("Azure AI Search endpoint is required"));
        }

        if self.api_key.is_empty() {
            return Err(ServiceError::configuration("Azure AI Search API key is required"));
        }

        validate_url("Azure AI Search endpoint", &self.endpoint)?;

        Ok(())
    }

    fn service_name(&self) -> &str {
        "azure_search"
    }
}
