//! Tests for error categories and service error mapping

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use crate::error::{mapping, ErrorDetails, ServiceError};

    #[test]
    fn test_service_error_creation() {
        let network_err = ServiceError::network("Connection failed");
        let auth_err = ServiceError::authentication("Invalid credentials");
        let rate_limit_err = ServiceError::rate_limit("Too many requests");

        assert_eq!(network_err.to_string(), "Network error: Connection failed");
        assert_eq!(auth_err.to_string(), "Authentication error: Invalid credentials");
        assert_eq!(rate_limit_err.to_string(), "Rate limit exceeded: Too many requests");

        assert!(network_err.is_retryable());
        assert!(!auth_err.is_retryable());
        assert!(rate_limit_err.is_retryable());
        assert!(auth_err.is_permanent());
    }

    #[test]
    fn test_error_details() {
        let details = ErrorDetails::for_service("github")
            .status_code(404)
            .endpoint("/search/issues")
            .with("query", "MissingEnv");

        let err = ServiceError::not_found("No such repository").with_context(details);

        assert_eq!(err.service_name(), Some("github"));
        assert_eq!(err.status_code(), Some(404));
        assert!(err.to_string().contains("No such repository"));
        assert!(matches!(err.root(), ServiceError::NotFound(_)));
    }

    #[test]
    fn test_context_preserves_retryability() {
        let err = ServiceError::timeout("slow").with_context_value("attempts", 3);
        assert!(err.is_retryable());

        let broken = ServiceError::circuit_broken("github").with_context_value("stage", "retrieve");
        assert!(!broken.is_retryable());
        assert!(matches!(broken.root(), ServiceError::CircuitBroken(_)));
    }

    #[test]
    fn test_map_openai_error() {
        let mut details = ErrorDetails::for_service("openai");
        let body = r#"{"error":{"code":"429","message":"Rate limit reached","type":"requests"}}"#;
        let err = mapping::map_http_error(StatusCode::TOO_MANY_REQUESTS, body, &mut details);
        assert!(matches!(err, ServiceError::RateLimit(_)));
        assert_eq!(details.error_code.as_deref(), Some("429"));

        let mut details = ErrorDetails::for_service("openai");
        let body = r#"{"error":{"code":"content_filter","message":"filtered"}}"#;
        let err = mapping::map_http_error(StatusCode::BAD_REQUEST, body, &mut details);
        assert!(matches!(err, ServiceError::Validation(ref m) if m.contains("Content filtered")));
    }

    #[test]
    fn test_map_github_rate_limit_on_forbidden() {
        let mut details = ErrorDetails::for_service("github");
        let body = r#"{"message":"API rate limit exceeded for user","documentation_url":"https://docs.github.com/rest"}"#;
        let err = mapping::map_http_error(StatusCode::FORBIDDEN, body, &mut details);

        assert!(matches!(err, ServiceError::RateLimit(_)));
        assert!(details.data.contains_key("documentation_url"));

        let mut details = ErrorDetails::for_service("github");
        let err = mapping::map_http_error(StatusCode::FORBIDDEN, r#"{"message":"Forbidden"}"#, &mut details);
        assert!(matches!(err, ServiceError::Authorization(_)));
    }

    #[test]
    fn test_map_azure_search_error() {
        let mut details = ErrorDetails::for_service("azure_search");
        let body = r#"{"error":{"code":"InvalidRequestParameter","message":"Unknown field"}}"#;
        let err = mapping::map_http_error(StatusCode::BAD_REQUEST, body, &mut details);

        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(details.error_code.as_deref(), Some("InvalidRequestParameter"));
    }

    #[test]
    fn test_map_non_json_body() {
        let mut details = ErrorDetails::for_service("github");
        let err = mapping::map_http_error(StatusCode::BAD_GATEWAY, "upstream down", &mut details);
        assert!(matches!(err, ServiceError::Network(_)));
        assert!(err.is_retryable());

        let err = mapping::map_http_error(StatusCode::INTERNAL_SERVER_ERROR, "", &mut details);
        assert!(matches!(err, ServiceError::Service(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_status_helpers() {
        assert!(mapping::is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(mapping::is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!mapping::is_retryable_status(StatusCode::UNAUTHORIZED));
        assert_eq!(mapping::classify_http_error(StatusCode::NOT_FOUND), "not_found");
        assert_eq!(mapping::classify_http_error(StatusCode::INTERNAL_SERVER_ERROR), "server");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ServiceError = json_err.into();
        assert!(matches!(err.root(), ServiceError::Parsing(_)));
    }
}
