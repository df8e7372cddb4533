//! Mock tests for the GitHub client

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::GithubConfig;
    use crate::error::ServiceError;
    use crate::resilience::{CircuitBreakerConfig, Resilience, RetryConfig};
    use crate::services::github::{GithubClient, COMMENT_LIMIT, MAX_PER_PAGE, SEARCH_RESULT_CAP};

    fn client(server: &MockServer, token: &str) -> GithubClient {
        GithubClient::new(GithubConfig {
            token: token.to_string(),
            base_url: server.uri(),
            timeout_seconds: 5,
        })
        .unwrap()
        .with_resilience(Resilience::new(
            "github",
            RetryConfig::none(),
            CircuitBreakerConfig::default(),
        ))
    }

    fn issue(server: &MockServer, number: u64, comments: u64) -> serde_json::Value {
        json!({
            "number": number,
            "title": format!("Issue {}", number),
            "body": "teamsApp.MissingEnv when provisioning",
            "state": "closed",
            "html_url": format!("https://github.com/OfficeDev/teams-toolkit/issues/{}", number),
            "comments": comments,
            "comments_url": format!("{}/repos/OfficeDev/teams-toolkit/issues/{}/comments", server.uri(), number),
            "user": {"login": "reporter"}
        })
    }

    fn comments(count: usize) -> serde_json::Value {
        json!((1..=count)
            .map(|i| json!({"body": format!("comment {}", i), "user": {"login": format!("user{}", i)}}))
            .collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn test_search_attaches_last_comments() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param("q", "MissingEnv repo:OfficeDev/teams-toolkit"))
            .and(header("authorization", "token ghp_test"))
            .and(header("accept", "application/vnd.github.v3+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 2,
                "incomplete_results": false,
                "items": [issue(&server, 1, 7), issue(&server, 2, 0)]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/OfficeDev/teams-toolkit/issues/1/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(comments(7)))
            .expect(1)
            .mount(&server)
            .await;

        // issue 2 has no comments, so its comments URL must never be fetched
        Mock::given(method("GET"))
            .and(path("/repos/OfficeDev/teams-toolkit/issues/2/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(comments(1)))
            .expect(0)
            .mount(&server)
            .await;

        let results = client(&server, "ghp_test")
            .search_with_comments("OfficeDev/teams-toolkit", "MissingEnv")
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].issue.number, 1);
        assert_eq!(results[0].comments.len(), COMMENT_LIMIT);
        assert_eq!(results[0].comments[0].body.as_deref(), Some("comment 3"));
        assert_eq!(results[0].comments[4].author(), "user7");
        assert!(results[1].comments.is_empty());
    }

    #[tokio::test]
    async fn test_failed_comment_fetch_is_skipped() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 1,
                "items": [issue(&server, 9, 3)]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/OfficeDev/teams-toolkit/issues/9/comments"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let results = client(&server, "ghp_test")
            .search_with_comments("OfficeDev/teams-toolkit", "anything")
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].comments.is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server, "")
            .search_issues("OfficeDev/teams-toolkit", "MissingEnv", None)
            .await
            .unwrap_err();

        assert!(matches!(err.root(), ServiceError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_search_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Validation Failed",
                "documentation_url": "https://docs.github.com/v3/search"
            })))
            .mount(&server)
            .await;

        let err = client(&server, "ghp_test")
            .search_issues("missing/repo", "x", None)
            .await
            .unwrap_err();

        assert!(matches!(err.root(), ServiceError::Validation(_)));
        assert_eq!(err.service_name(), Some("github"));
        assert_eq!(err.status_code(), Some(422));
    }

    #[tokio::test]
    async fn test_crawl_pages_until_total_reached() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param("page", "1"))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 3,
                "items": [issue(&server, 1, 0), issue(&server, 2, 0)]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 3,
                "items": [issue(&server, 3, 0)]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_count": 3, "items": []})))
            .expect(0)
            .mount(&server)
            .await;

        let issues = client(&server, "ghp_test")
            .crawl_issues("OfficeDev/teams-toolkit", "is:issue is:closed", 10)
            .await
            .unwrap();

        let numbers: Vec<u64> = issues.iter().map(|i| i.issue.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_crawl_respects_max_pages() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"total_count": 1000, "items": [issue(&server, 1, 0)]}))
                    .set_delay(Duration::from_millis(1)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let issues = client(&server, "ghp_test")
            .crawl_issues("OfficeDev/teams-toolkit", "is:issue", 2)
            .await
            .unwrap();

        assert_eq!(issues.len(), 2);
    }

    #[tokio::test]
    async fn test_crawl_stops_at_search_cap() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"total_count": 5000, "items": [issue(&server, 1, 0)]})),
            )
            .expect(u64::from(SEARCH_RESULT_CAP / MAX_PER_PAGE))
            .mount(&server)
            .await;

        let issues = client(&server, "ghp_test")
            .crawl_issues("OfficeDev/teams-toolkit", "is:issue", 50)
            .await
            .unwrap();

        assert_eq!(issues.len(), (SEARCH_RESULT_CAP / MAX_PER_PAGE) as usize);
    }

    #[tokio::test]
    async fn test_crawl_keeps_pages_read_before_a_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 3000,
                "items": [issue(&server, 1, 0), issue(&server, 2, 0)]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Only the first 1000 search results are available"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let issues = client(&server, "ghp_test")
            .crawl_issues("OfficeDev/teams-toolkit", "is:issue", 10)
            .await
            .unwrap();

        let numbers: Vec<u64> = issues.iter().map(|i| i.issue.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_crawl_first_page_failure_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({"message": "Validation Failed"})))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, "ghp_test")
            .crawl_issues("OfficeDev/teams-toolkit", "is:issue", 10)
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(422));
    }
}
