//! Hybrid semantic and vector search over Stack Overflow posts

use std::sync::Arc;

use async_trait::async_trait;
use copilot_sdk::azure_search::{AzureSearchClient, SearchRequest};
use copilot_sdk::core::Embedder;
use copilot_sdk::error::Result;
use log::debug;
use serde::Deserialize;

use super::Retriever;
use crate::types::{QaAnswer, QaResult, SearchResult};

pub const STACK_OVERFLOW_INDEX: &str = "cosmosdb-index-stack-overflow-with-body";
pub const STACK_OVERFLOW_SEMANTIC_CONFIG: &str = "stack-overflow-semantic";
pub const STACK_OVERFLOW_VECTOR_FIELD: &str = "question_vector";
const NEIGHBOURS: usize = 10;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Question {
    pub title: String,
    pub body: String,
    pub link: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Answer {
    pub body: String,
    pub is_accepted: bool,
    pub score: i64,
}

/// A question with its answers, as stored in the index
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StackOverflowPost {
    pub question: Question,
    pub answers: Vec<Answer>,
}

impl From<StackOverflowPost> for SearchResult {
    fn from(post: StackOverflowPost) -> Self {
        SearchResult::Qa(QaResult {
            url: post.question.link,
            title: post.question.title,
            body: post.question.body,
            answers: post
                .answers
                .into_iter()
                .map(|a| QaAnswer {
                    body: a.body,
                    is_accepted: a.is_accepted,
                })
                .collect(),
        })
    }
}

pub struct StackOverflowRetriever {
    embedder: Arc<dyn Embedder>,
    search: Arc<AzureSearchClient>,
    embedding_model: String,
    index: String,
}

impl StackOverflowRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, search: Arc<AzureSearchClient>, embedding_model: impl Into<String>) -> Self {
        Self {
            embedder,
            search,
            embedding_model: embedding_model.into(),
            index: STACK_OVERFLOW_INDEX.to_string(),
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }
}

#[async_trait]
impl Retriever for StackOverflowRetriever {
    fn name(&self) -> &str {
        "stack_overflow"
    }

    /// Posts are not tied to a repository; `repository` is ignored.
    async fn retrieve(&self, _repository: &str, query: &str) -> Result<Vec<SearchResult>> {
        let vector = self.embedder.embed(&self.embedding_model, query).await?;
        let request = SearchRequest::hybrid(query, vector, STACK_OVERFLOW_VECTOR_FIELD, NEIGHBOURS)
            .semantic(STACK_OVERFLOW_SEMANTIC_CONFIG);
        let hits = self.search.search::<StackOverflowPost>(&self.index, &request).await?;

        debug!("Stack Overflow index returned {} post(s) for '{}'", hits.len(), query);
        Ok(hits.into_iter().map(|hit| hit.document.into()).collect())
    }
}
