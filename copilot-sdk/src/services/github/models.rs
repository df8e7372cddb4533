//! GitHub REST API data models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GithubUser {
    #[serde(default)]
    pub login: String,
}

/// An issue or pull request returned by the search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubIssue {
    #[serde(default)]
    pub number: u64,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub state: String,

    /// Browser URL
    #[serde(default)]
    pub html_url: String,

    /// Number of comments on the issue
    #[serde(default)]
    pub comments: u64,

    #[serde(default)]
    pub comments_url: String,

    #[serde(default)]
    pub user: Option<GithubUser>,
}

/// `GET /search/issues` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueSearchResponse {
    #[serde(default)]
    pub total_count: u64,

    #[serde(default)]
    pub incomplete_results: bool,

    #[serde(default)]
    pub items: Vec<GithubIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubComment {
    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub user: Option<GithubUser>,

    #[serde(default)]
    pub created_at: Option<String>,
}

impl GithubComment {
    pub fn author(&self) -> &str {
        self.user.as_ref().map(|u| u.login.as_str()).unwrap_or("")
    }
}

/// An issue together with its most recent comments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueWithComments {
    pub issue: GithubIssue,
    pub comments: Vec<GithubComment>,
}
