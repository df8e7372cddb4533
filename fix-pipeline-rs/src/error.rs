//! Error type for the troubleshooting pipeline

use copilot_sdk::error::ServiceError;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, FixError>;

#[derive(Error, Debug)]
pub enum FixError {
    /// A backend call failed after retries
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The request was cancelled by the caller
    #[error("Request cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FixError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FixError::Cancelled)
    }

    /// Short, user-facing description
    pub fn user_message(&self) -> String {
        match self {
            FixError::Cancelled => "The request was cancelled.".to_string(),
            FixError::Service(e) => match e.service_name() {
                Some(service) => format!("The {} service failed: {}", service, e.root()),
                None => format!("A backend call failed: {}", e.root()),
            },
            FixError::Io(e) => format!("Could not read local data: {}", e),
        }
    }
}
