//! Lexical issue search through the GitHub REST API

use std::sync::Arc;

use async_trait::async_trait;
use copilot_sdk::error::Result;
use copilot_sdk::github::{GithubClient, IssueWithComments};

use super::Retriever;
use crate::types::{IssueComment, IssueResult, SearchResult};

/// Searches issues of a repository and attaches their latest comments
#[derive(Debug, Clone)]
pub struct GithubRestRetriever {
    client: Arc<GithubClient>,
}

impl GithubRestRetriever {
    pub fn new(client: Arc<GithubClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Retriever for GithubRestRetriever {
    fn name(&self) -> &str {
        "github_rest"
    }

    async fn retrieve(&self, repository: &str, query: &str) -> Result<Vec<SearchResult>> {
        let issues = self.client.search_with_comments(repository, query).await?;
        Ok(issues.into_iter().map(SearchResult::from).collect())
    }
}

impl From<IssueWithComments> for SearchResult {
    fn from(found: IssueWithComments) -> Self {
        let comments = found
            .comments
            .iter()
            .map(|c| IssueComment {
                author: c.author().to_string(),
                body: c.body.clone().unwrap_or_default(),
            })
            .collect();

        SearchResult::Issue(IssueResult {
            url: found.issue.html_url,
            title: found.issue.title,
            body: found.issue.body.unwrap_or_default(),
            state: found.issue.state,
            comments,
        })
    }
}
