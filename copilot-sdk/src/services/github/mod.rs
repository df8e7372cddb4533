//! GitHub REST API client
//!
//! Issue search scoped to one repository, with the latest comments of
//! each hit attached. Multi-page crawling is available for offline use.

mod models;
pub use models::*;

use std::time::Duration;

use futures::future::join_all;
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::{ConfigProvider, GithubConfig, ServiceConfig};
use crate::core::{AuthenticatedClient, ServiceClient};
use crate::error::{ErrorDetails, Result, ServiceError};
use crate::resilience::{Resilience, RetryConfig, CircuitBreakerConfig};
use crate::services::common::{build_http_client, read_json, UserAgent};
use crate::util::sanitize_for_logging;

const SERVICE: &str = "github";

/// How many of the most recent comments are attached to an issue
pub const COMMENT_LIMIT: usize = 5;

/// Largest page size the search endpoint accepts
pub const MAX_PER_PAGE: u32 = 100;

/// GitHub search serves at most this many results per query
pub const SEARCH_RESULT_CAP: u32 = 1000;

/// Client for the GitHub REST API
#[derive(Debug, Clone)]
pub struct GithubClient {
    http_client: Client,
    config: GithubConfig,
    resilience: Resilience,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> Result<Self> {
        config.validate()?;

        let http_client = build_http_client(
            UserAgent::for_client("github"),
            Duration::from_secs(config.timeout_seconds),
        )?;

        let resilience = Resilience::new(
            SERVICE,
            RetryConfig {
                max_retries: 2,
                initial_interval: Duration::from_secs(1),
                ..RetryConfig::default()
            },
            CircuitBreakerConfig::default(),
        );

        Ok(Self {
            http_client,
            config,
            resilience,
        })
    }

    /// Build a client from configuration keys (`github_*`)
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        Self::new(GithubConfig::from_provider(provider)?)
    }

    pub fn with_resilience(mut self, resilience: Resilience) -> Self {
        self.resilience = resilience;
        self
    }

    /// One page of `GET /search/issues?q=<query> repo:<repo>`
    pub async fn search_issues(
        &self,
        repo: &str,
        query: &str,
        page: Option<(u32, u32)>,
    ) -> Result<IssueSearchResponse> {
        let url = format!("{}/search/issues", self.config.base_url.trim_end_matches('/'));
        let mut params = vec![("q", format!("{} repo:{}", query, repo))];
        if let Some((page, per_page)) = page {
            params.push(("per_page", per_page.min(MAX_PER_PAGE).to_string()));
            params.push(("page", page.to_string()));
        }

        self.get_json(&url, &params).await
    }

    /// The last [`COMMENT_LIMIT`] comments of an issue
    pub async fn fetch_comments(&self, issue: &GithubIssue) -> Result<Vec<GithubComment>> {
        if issue.comments == 0 || issue.comments_url.is_empty() {
            return Ok(Vec::new());
        }

        let mut comments: Vec<GithubComment> = self.get_json(&issue.comments_url, &[]).await?;
        let skip = comments.len().saturating_sub(COMMENT_LIMIT);
        Ok(comments.split_off(skip))
    }

    /// Attach comments to each issue. A failed comment fetch leaves that
    /// issue without comments.
    pub async fn attach_comments(&self, issues: Vec<GithubIssue>) -> Vec<IssueWithComments> {
        let fetches = issues.into_iter().map(|issue| async move {
            let comments = match self.fetch_comments(&issue).await {
                Ok(comments) => comments,
                Err(e) => {
                    warn!("Failed to fetch comments for issue #{}: {}", issue.number, e);
                    Vec::new()
                }
            };
            IssueWithComments { issue, comments }
        });

        join_all(fetches).await
    }

    /// First page of matching issues, each with its latest comments
    pub async fn search_with_comments(&self, repo: &str, query: &str) -> Result<Vec<IssueWithComments>> {
        let response = self.search_issues(repo, query, None).await?;
        debug!(
            "GitHub search '{}' in {} returned {} of {} issues",
            query,
            repo,
            response.items.len(),
            response.total_count
        );
        Ok(self.attach_comments(response.items).await)
    }

    /// Page through every match of `query` in `repo`.
    ///
    /// Stops when the reported total is reached, a page comes back empty,
    /// or `max_pages` pages have been read. `max_pages` is capped at the
    /// pages GitHub search will serve. A failure on the first page is an
    /// error; a later one ends the crawl with the issues read so far.
    pub async fn crawl_issues(
        &self,
        repo: &str,
        query: &str,
        max_pages: u32,
    ) -> Result<Vec<IssueWithComments>> {
        let max_pages = max_pages.min(SEARCH_RESULT_CAP / MAX_PER_PAGE);
        let mut collected = Vec::new();
        let mut page = 1;

        while page <= max_pages {
            let response = match self
                .search_issues(repo, query, Some((page, MAX_PER_PAGE)))
                .await
            {
                Ok(response) => response,
                Err(e) if page > 1 => {
                    warn!(
                        "Crawl of '{}' in {} stopped at page {}: {}",
                        query, repo, page, e
                    );
                    break;
                }
                Err(e) => return Err(e),
            };
            let fetched = response.items.len();
            info!(
                "Crawled page {} of '{}' in {}: {} issues (total {})",
                page, query, repo, fetched, response.total_count
            );

            collected.extend(self.attach_comments(response.items).await);

            if fetched == 0 || collected.len() as u64 >= response.total_count {
                break;
            }
            page += 1;
        }

        Ok(collected)
    }

    async fn get_json<R: DeserializeOwned>(&self, url: &str, params: &[(&str, String)]) -> Result<R> {
        let mut headers = HeaderMap::new();
        self.apply_auth(&mut headers)?;
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github.v3+json"));

        let (headers, client) = (&headers, &self.http_client);
        self.resilience
            .execute(move || async move {
                debug!("Sending request to GitHub: GET {}", sanitize_for_logging(url));
                let response = client
                    .get(url)
                    .headers(headers.clone())
                    .query(params)
                    .send()
                    .await?;
                read_json(SERVICE, url, response).await
            })
            .await
    }
}

impl ServiceClient for GithubClient {
    fn name(&self) -> &str {
        SERVICE
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

impl AuthenticatedClient for GithubClient {
    fn auth_type(&self) -> &str {
        "token"
    }

    fn is_authenticated(&self) -> bool {
        !self.config.token.is_empty()
    }

    fn apply_auth(&self, headers: &mut HeaderMap) -> Result<()> {
        if !self.is_authenticated() {
            return Err(ServiceError::authentication("No GitHub token configured")
                .with_context(ErrorDetails::for_service(SERVICE)));
        }

        let value = HeaderValue::from_str(&format!("token {}", self.config.token))
            .map_err(|_| ServiceError::configuration("GitHub token contains invalid header characters"))?;
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}
