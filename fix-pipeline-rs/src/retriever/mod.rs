//! Multi-source retrieval
//!
//! A [`Retriever`] answers one query against one backend. The batch
//! functions fan a list of queries out through a [`Bulkhead`] and merge the
//! results query-major: everything for the first query, then everything
//! for the second, and so on, whatever order the calls finish in.

mod github_rest;
mod github_vector;
mod stack_overflow;

pub use github_rest::GithubRestRetriever;
pub use github_vector::{GithubVectorRetriever, IssueDocument, GITHUB_ISSUE_INDEX};
pub use stack_overflow::{
    StackOverflowPost, StackOverflowRetriever, STACK_OVERFLOW_INDEX, STACK_OVERFLOW_SEMANTIC_CONFIG,
    STACK_OVERFLOW_VECTOR_FIELD,
};

use async_trait::async_trait;
use copilot_sdk::error::{Result, ServiceError};
use copilot_sdk::resilience::Bulkhead;
use log::{debug, warn};

use crate::types::SearchResult;

/// One search backend
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Name used in logs and failure reports
    fn name(&self) -> &str {
        "retriever"
    }

    /// Results for a single query, in backend order
    async fn retrieve(&self, repository: &str, query: &str) -> Result<Vec<SearchResult>>;
}

/// A query that failed during a settled batch
#[derive(Debug)]
pub struct QueryFailure {
    pub query: String,
    pub error: ServiceError,
}

/// Outcome of [`batch_retrieve_settled`]
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub results: Vec<SearchResult>,
    pub failures: Vec<QueryFailure>,
}

async fn fan_out(
    retriever: &dyn Retriever,
    repository: &str,
    queries: &[String],
    bulkhead: &Bulkhead,
) -> Vec<Result<Vec<SearchResult>>> {
    bulkhead
        .run_all(queries.iter(), |query| async move {
            retriever.retrieve(repository, query).await
        })
        .await
}

fn truncate(mut results: Vec<SearchResult>, limit: Option<usize>) -> Vec<SearchResult> {
    if let Some(limit) = limit {
        results.truncate(limit);
    }
    results
}

/// Run every query concurrently and merge the results query-major,
/// truncated to `limit`.
///
/// No queries means no backend calls. If any query fails the whole batch
/// fails with the error of the first failing query.
pub async fn batch_retrieve(
    retriever: &dyn Retriever,
    repository: &str,
    queries: &[String],
    limit: Option<usize>,
    bulkhead: &Bulkhead,
) -> Result<Vec<SearchResult>> {
    if queries.is_empty() {
        return Ok(Vec::new());
    }

    let responses = fan_out(retriever, repository, queries, bulkhead).await;

    let mut results = Vec::new();
    for (query, response) in queries.iter().zip(responses) {
        match response {
            Ok(found) => results.extend(found),
            Err(e) => {
                return Err(e
                    .with_context_value("retriever", retriever.name())
                    .with_context_value("query", query))
            }
        }
    }

    debug!(
        "{} returned {} result(s) for {} queries",
        retriever.name(),
        results.len(),
        queries.len()
    );
    Ok(truncate(results, limit))
}

/// Like [`batch_retrieve`], but a failed query is recorded and the
/// remaining results are kept. `limit` applies to the successful results.
pub async fn batch_retrieve_settled(
    retriever: &dyn Retriever,
    repository: &str,
    queries: &[String],
    limit: Option<usize>,
    bulkhead: &Bulkhead,
) -> BatchOutcome {
    if queries.is_empty() {
        return BatchOutcome::default();
    }

    let responses = fan_out(retriever, repository, queries, bulkhead).await;

    let mut outcome = BatchOutcome::default();
    for (query, response) in queries.iter().zip(responses) {
        match response {
            Ok(found) => outcome.results.extend(found),
            Err(error) => {
                warn!("{} failed for query '{}': {}", retriever.name(), query, error);
                outcome.failures.push(QueryFailure {
                    query: query.clone(),
                    error,
                });
            }
        }
    }

    outcome.results = truncate(outcome.results, limit);
    outcome
}
