//! Vector search over pre-indexed GitHub issues

use std::sync::Arc;

use async_trait::async_trait;
use copilot_sdk::azure_search::{AzureSearchClient, SearchRequest};
use copilot_sdk::core::Embedder;
use copilot_sdk::error::Result;
use log::debug;
use serde::Deserialize;

use super::Retriever;
use crate::types::{IssueComment, IssueResult, SearchResult};

pub const GITHUB_ISSUE_INDEX: &str = "github-issue-index";
const DEFAULT_VECTOR_FIELD: &str = "content_vector";
const DEFAULT_TOP: usize = 3;

/// An issue document as stored in the index. Comments are indexed with
/// the issue, so nothing is fetched at query time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IssueDocument {
    pub url: String,
    pub title: String,
    pub body: String,
    pub state: String,
    pub comments: Vec<IssueComment>,
}

impl From<IssueDocument> for SearchResult {
    fn from(doc: IssueDocument) -> Self {
        SearchResult::Issue(IssueResult {
            url: doc.url,
            title: doc.title,
            body: doc.body,
            state: doc.state,
            comments: doc.comments,
        })
    }
}

pub struct GithubVectorRetriever {
    embedder: Arc<dyn Embedder>,
    search: Arc<AzureSearchClient>,
    embedding_model: String,
    index: String,
    vector_field: String,
    top: usize,
}

impl GithubVectorRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, search: Arc<AzureSearchClient>, embedding_model: impl Into<String>) -> Self {
        Self {
            embedder,
            search,
            embedding_model: embedding_model.into(),
            index: GITHUB_ISSUE_INDEX.to_string(),
            vector_field: DEFAULT_VECTOR_FIELD.to_string(),
            top: DEFAULT_TOP,
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn with_vector_field(mut self, field: impl Into<String>) -> Self {
        self.vector_field = field.into();
        self
    }

    pub fn with_top(mut self, top: usize) -> Self {
        self.top = top;
        self
    }
}

#[async_trait]
impl Retriever for GithubVectorRetriever {
    fn name(&self) -> &str {
        "github_vector"
    }

    /// The index holds a single repository, so `repository` only shows up
    /// in logs.
    async fn retrieve(&self, repository: &str, query: &str) -> Result<Vec<SearchResult>> {
        let vector = self.embedder.embed(&self.embedding_model, query).await?;
        let request = SearchRequest::hybrid(query, vector, self.vector_field.as_str(), self.top);
        let hits = self.search.search::<IssueDocument>(&self.index, &request).await?;

        debug!("Issue index returned {} hit(s) for '{}' ({})", hits.len(), query, repository);
        Ok(hits.into_iter().map(|hit| hit.document.into()).collect())
    }
}
