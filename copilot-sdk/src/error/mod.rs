//! Error handling for the Copilot SDK
//!
//! This module provides the error system shared by every backend client:
//! - Categorizes errors by type (network, auth, rate limit, etc.)
//! - Attaches service details (status, error code, endpoint) for debugging
//! - Maps service-specific error bodies to normalized categories
//! - Provides a convenient Result type alias

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub mod mapping;

/// Result type for Copilot SDK operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for the Copilot SDK
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Network or connection errors
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication errors, including missing credentials
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Authorization errors (permission issues)
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Service-side failures (5xx, unexpected statuses)
    #[error("Service error: {0}")]
    Service(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Response parsing errors
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Resource not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Circuit breaker open errors
    #[error("Circuit broken: {0}")]
    CircuitBroken(String),

    /// Unexpected or internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// Errors with additional details
    #[error("{inner}")]
    WithContext {
        inner: Box<ServiceError>,
        details: ErrorDetails,
    },
}

impl ServiceError {
    pub fn network(message: impl Into<String>) -> Self {
        ServiceError::Network(message.into())
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        ServiceError::Authentication(message.into())
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        ServiceError::Authorization(message.into())
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        ServiceError::RateLimit(message.into())
    }

    pub fn service(message: impl Into<String>) -> Self {
        ServiceError::Service(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn parsing(message: impl Into<String>) -> Self {
        ServiceError::Parsing(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration(message.into())
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        ServiceError::Timeout(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn circuit_broken(message: impl Into<String>) -> Self {
        ServiceError::CircuitBroken(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }

    /// Attach details to an existing error
    pub fn with_context(self, details: ErrorDetails) -> Self {
        ServiceError::WithContext {
            inner: Box::new(self),
            details,
        }
    }

    /// Attach a single key/value to an existing error
    pub fn with_context_value(self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        let mut details = ErrorDetails::new();
        details.add(key, value);
        self.with_context(details)
    }

    /// The innermost error, with every layer of details stripped
    pub fn root(&self) -> &ServiceError {
        match self {
            ServiceError::WithContext { inner, .. } => inner.root(),
            other => other,
        }
    }

    /// Get the service error code if available
    pub fn error_code(&self) -> Option<&str> {
        match self {
            ServiceError::WithContext { details, inner } => {
                details.error_code.as_deref().or_else(|| inner.error_code())
            }
            _ => None,
        }
    }

    /// Get the service name if available
    pub fn service_name(&self) -> Option<&str> {
        match self {
            ServiceError::WithContext { details, .. } => Some(&details.service),
            _ => None,
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::WithContext { details, inner } => {
                details.status_code.or_else(|| inner.status_code())
            }
            _ => None,
        }
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Network(_) => true,
            ServiceError::Timeout(_) => true,
            ServiceError::RateLimit(_) => true,
            ServiceError::WithContext { inner, .. } => inner.is_retryable(),
            _ => false,
        }
    }

    /// Check if this is a permanent error (not retryable)
    pub fn is_permanent(&self) -> bool {
        !self.is_retryable()
    }
}

/// Details attached to an error by the client that produced it
#[derive(Debug, Clone)]
pub struct ErrorDetails {
    /// Service that generated the error
    pub service: String,

    /// When the error was observed
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,

    /// HTTP status code if applicable
    pub status_code: Option<u16>,

    /// Service-specific error code
    pub error_code: Option<String>,

    /// Endpoint that was called
    pub endpoint: Option<String>,

    /// Additional data
    pub data: HashMap<String, String>,
}

impl Default for ErrorDetails {
    fn default() -> Self {
        Self {
            service: "unknown".to_string(),
            timestamp: Some(chrono::Utc::now()),
            status_code: None,
            error_code: None,
            endpoint: None,
            data: HashMap::new(),
        }
    }
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create details for a specific service
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    pub fn error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn add<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.data.insert(key.into(), value.to_string());
    }

    /// Add a value and return self (builder pattern)
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.add(key, value);
        self
    }
}

/// Convert reqwest errors to ServiceError
impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        let details = ErrorDetails::for_service("http_client");

        let service_error = if err.is_timeout() {
            ServiceError::timeout(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            ServiceError::network(format!("Connection error: {}", err))
        } else if err.is_request() {
            ServiceError::network(format!("Request failed: {}", err))
        } else if err.is_redirect() {
            ServiceError::network(format!("Too many redirects: {}", err))
        } else if err.is_decode() || err.is_body() {
            ServiceError::parsing(format!("Response decode error: {}", err))
        } else {
            ServiceError::internal(format!("HTTP client error: {}", err))
        };

        match err.status() {
            Some(status) => service_error.with_context(details.status_code(status.as_u16())),
            None => service_error.with_context(details),
        }
    }
}

/// Convert serde_json errors to ServiceError
impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::parsing(format!("JSON error: {}", err))
            .with_context(ErrorDetails::for_service("json"))
    }
}
