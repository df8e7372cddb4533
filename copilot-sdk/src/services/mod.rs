//! Service-specific client implementations

pub mod azure_search;
pub mod github;
pub mod openai;
mod common;

pub use common::UserAgent;
