//! Retrievers wired to real clients talking to WireMock servers

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use copilot_sdk::azure_search::AzureSearchClient;
    use copilot_sdk::config::{ApiFlavor, AzureSearchConfig, GithubConfig, LanguageModelConfig};
    use copilot_sdk::github::GithubClient;
    use copilot_sdk::openai::OpenAIClient;
    use copilot_sdk::resilience::{CircuitBreakerConfig, Resilience, RetryConfig};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::retriever::{
        GithubRestRetriever, GithubVectorRetriever, Retriever, StackOverflowRetriever, GITHUB_ISSUE_INDEX,
        STACK_OVERFLOW_INDEX,
    };
    use crate::types::SearchResult;

    fn no_retry(name: &str) -> Resilience {
        Resilience::new(name, RetryConfig::none(), CircuitBreakerConfig::default())
    }

    fn embedder(server: &MockServer) -> Arc<OpenAIClient> {
        let client = OpenAIClient::new(LanguageModelConfig {
            flavor: ApiFlavor::Azure,
            api_key: "llm-key".to_string(),
            base_url: server.uri(),
            timeout_seconds: 5,
            ..LanguageModelConfig::default()
        })
        .unwrap()
        .with_resilience(no_retry("openai"));
        Arc::new(client)
    }

    fn search(server: &MockServer) -> Arc<AzureSearchClient> {
        let client = AzureSearchClient::new(AzureSearchConfig {
            endpoint: server.uri(),
            api_key: "search-key".to_string(),
            ..AzureSearchConfig::default()
        })
        .unwrap()
        .with_resilience(no_retry("azure_search"));
        Arc::new(client)
    }

    async fn mount_embedding(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/openai/deployments/text-embedding-3-large/embeddings"))
            .and(body_partial_json(json!({"input": "teamsApp.MissingEnv"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"embedding": [0.25, 0.5], "index": 0}],
                "usage": {"prompt_tokens": 3, "total_tokens": 3}
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_github_rest_retriever_maps_issues() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param("q", "teamsApp.MissingEnv repo:OfficeDev/teams-toolkit"))
            .and(header("authorization", "token ghp_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 1,
                "items": [{
                    "number": 42,
                    "title": "MissingEnv on provision",
                    "body": null,
                    "state": "closed",
                    "html_url": "https://github.com/OfficeDev/teams-toolkit/issues/42",
                    "comments": 1,
                    "comments_url": format!("{}/repos/OfficeDev/teams-toolkit/issues/42/comments", server.uri())
                }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/OfficeDev/teams-toolkit/issues/42/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"body": "Fixed by adding TEAMS_APP_ID", "user": {"login": "maintainer"}}
            ])))
            .mount(&server)
            .await;

        let client = GithubClient::new(GithubConfig {
            token: "ghp_test".to_string(),
            base_url: server.uri(),
            timeout_seconds: 5,
        })
        .unwrap()
        .with_resilience(no_retry("github"));
        let retriever = GithubRestRetriever::new(Arc::new(client));

        let results = retriever
            .retrieve("OfficeDev/teams-toolkit", "teamsApp.MissingEnv")
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        match &results[0] {
            SearchResult::Issue(issue) => {
                assert_eq!(issue.url, "https://github.com/OfficeDev/teams-toolkit/issues/42");
                assert_eq!(issue.body, "");
                assert_eq!(issue.state, "closed");
                assert_eq!(issue.comments.len(), 1);
                assert_eq!(issue.comments[0].author, "maintainer");
                assert_eq!(issue.comments[0].body, "Fixed by adding TEAMS_APP_ID");
            }
            other => panic!("expected an issue, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stack_overflow_retriever_runs_hybrid_semantic_search() {
        let server = MockServer::start().await;
        mount_embedding(&server).await;

        Mock::given(method("POST"))
            .and(path(format!("/indexes/{}/docs/search", STACK_OVERFLOW_INDEX)))
            .and(header("api-key", "search-key"))
            .and(body_partial_json(json!({
                "search": "teamsApp.MissingEnv",
                "top": 10,
                "queryType": "semantic",
                "semanticConfiguration": "stack-overflow-semantic",
                "vectorQueries": [{"kind": "vector", "vector": [0.25, 0.5], "fields": "question_vector", "k": 10}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{
                    "@search.score": 3.2,
                    "question": {
                        "title": "Teams Toolkit says environment variables are missing",
                        "body": "<p>Provision fails</p>",
                        "link": "https://stackoverflow.com/questions/1234",
                        "tags": ["teams-toolkit"]
                    },
                    "answers": [
                        {"body": "Try restarting", "is_accepted": false, "score": 1},
                        {"body": "Fill in env/.env.dev", "is_accepted": true, "score": 9}
                    ],
                    "question_text": "ignored"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let retriever = StackOverflowRetriever::new(embedder(&server), search(&server), "text-embedding-3-large");
        let results = retriever.retrieve("ignored/repo", "teamsApp.MissingEnv").await.unwrap();

        assert_eq!(results.len(), 1);
        match &results[0] {
            SearchResult::Qa(post) => {
                assert_eq!(post.url, "https://stackoverflow.com/questions/1234");
                assert_eq!(post.answers.len(), 2);
                assert!(post.answers[1].is_accepted);
            }
            other => panic!("expected a Q&A post, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_github_vector_retriever_uses_issue_index() {
        let server = MockServer::start().await;
        mount_embedding(&server).await;

        Mock::given(method("POST"))
            .and(path(format!("/indexes/{}/docs/search", GITHUB_ISSUE_INDEX)))
            .and(body_partial_json(json!({
                "top": 3,
                "vectorQueries": [{"kind": "vector", "fields": "content_vector", "k": 3}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{
                    "@search.score": 1.5,
                    "url": "https://github.com/OfficeDev/teams-toolkit/issues/7",
                    "title": "Missing env",
                    "comments": [{"author": "dev", "body": "set it"}]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let retriever = GithubVectorRetriever::new(embedder(&server), search(&server), "text-embedding-3-large");
        let results = retriever
            .retrieve("OfficeDev/teams-toolkit", "teamsApp.MissingEnv")
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url(), "https://github.com/OfficeDev/teams-toolkit/issues/7");
        assert!(results[0].is_issue());
    }

    #[tokio::test]
    async fn test_embedding_failure_fails_the_query() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"code": "401", "message": "Access denied"}
            })))
            .mount(&server)
            .await;

        let retriever = StackOverflowRetriever::new(embedder(&server), search(&server), "text-embedding-3-large");
        let err = retriever.retrieve("", "teamsApp.MissingEnv").await.unwrap_err();

        assert!(err.to_string().contains("Access denied"));
    }
}
