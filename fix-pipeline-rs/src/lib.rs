//! Retrieval-augmented troubleshooting pipeline
//!
//! Turns a user's error report into an answer in a fixed sequence of
//! stages: error-context extraction, query rephrasing, search-pattern
//! extraction, multi-source retrieval, reranking, summarization and
//! answer synthesis. Every backend is reached through the clients in
//! `copilot-sdk`, and every language-model call goes through one
//! [`model::ModelSession`] so token usage and cancellation are tracked
//! per request.

pub mod config;
pub mod context;
pub mod error;
pub mod lenient;
pub mod log_source;
pub mod model;
pub mod patterns;
pub mod pipeline;
pub mod prompts;
pub mod rephrase;
pub mod rerank;
pub mod retriever;
pub mod sink;
pub mod summarize;
pub mod synthesize;
pub mod types;

pub use config::PipelineConfig;
pub use error::{FixError, Result};
pub use log_source::{FileLogSource, LogSource, StaticLogSource};
pub use model::ModelSession;
pub use pipeline::{FixReport, SourceBinding, SourceFailure, Troubleshooter};
pub use sink::{BufferSink, OutputSink};
pub use types::{
    ChatHistory, ChatTurn, ConversationTurn, ErrorContext, FixRequest, IssueComment, IssueResult,
    QaAnswer, QaResult, ScoredResult, SearchPlan, SearchResult, TokenUsage,
};

#[cfg(test)]
mod tests;
