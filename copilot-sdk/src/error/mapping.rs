//! Error mapping for service-specific APIs
//!
//! Converts the error bodies returned by each backend to the normalized
//! [`ServiceError`] categories.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorDetails, ServiceError};

fn by_status(status: StatusCode, message: impl Into<String>) -> ServiceError {
    let message = message.into();
    match status {
        StatusCode::UNAUTHORIZED => ServiceError::authentication(message),
        StatusCode::FORBIDDEN => ServiceError::authorization(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limit(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ServiceError::validation(message)
        }
        StatusCode::NOT_FOUND => ServiceError::not_found(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ServiceError::timeout(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => ServiceError::network(message),
        _ => ServiceError::service(message),
    }
}

/// Map an OpenAI / Azure OpenAI error body.
///
/// Both flavours wrap the failure in `{"error": {"code", "message", "type"}}`.
pub fn map_openai_error(status: StatusCode, json: &Value, details: &mut ErrorDetails) -> ServiceError {
    details.service = "openai".to_string();

    let Some(error) = json.get("error") else {
        let message = json
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown language model error");
        return by_status(status, message);
    };

    if let Some(error_type) = error.get("type").and_then(|t| t.as_str()) {
        details.add("error_type", error_type);
    }

    if let Some(code) = error.get("code").and_then(|c| c.as_str()) {
        details.error_code = Some(code.to_string());
    }

    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown language model error");

    // Azure reports content filtering as 400 with a dedicated code
    if details.error_code.as_deref() == Some("content_filter") {
        return ServiceError::validation(format!("Content filtered: {}", message));
    }

    by_status(status, message)
}

/// Map a GitHub REST error body (`{"message", "documentation_url"}`).
pub fn map_github_error(status: StatusCode, json: &Value, details: &mut ErrorDetails) -> ServiceError {
    details.service = "github".to_string();

    let message = json
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown GitHub error");

    if let Some(doc) = json.get("documentation_url").and_then(|d| d.as_str()) {
        details.add("documentation_url", doc);
    }

    // GitHub signals secondary rate limits with 403
    if status == StatusCode::FORBIDDEN && message.to_lowercase().contains("rate limit") {
        return ServiceError::rate_limit(message);
    }

    by_status(status, message)
}

/// Map an Azure AI Search error body (`{"error": {"code", "message"}}`).
pub fn map_azure_search_error(
    status: StatusCode,
    json: &Value,
    details: &mut ErrorDetails,
) -> ServiceError {
    details.service = "azure_search".to_string();

    let error = json.get("error").unwrap_or(json);
    if let Some(code) = error.get("code").and_then(|c| c.as_str()) {
        if !code.is_empty() {
            details.error_code = Some(code.to_string());
        }
    }

    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown Azure AI Search error");

    by_status(status, message)
}

/// Map a failed HTTP response to a ServiceError, dispatching on
/// `details.service` when the body is JSON.
pub fn map_http_error(status: StatusCode, body: &str, details: &mut ErrorDetails) -> ServiceError {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        return match details.service.as_str() {
            "openai" => map_openai_error(status, &json, details),
            "github" => map_github_error(status, &json, details),
            "azure_search" => map_azure_search_error(status, &json, details),
            _ => {
                let message = json
                    .get("message")
                    .or_else(|| json.get("error"))
                    .and_then(|m| m.as_str())
                    .unwrap_or(body);
                by_status(status, message)
            }
        };
    }

    let message = if body.is_empty() {
        status.to_string()
    } else if body.len() > 100 {
        format!("{}: {}...", status, crate::util::truncate_string(body, 100))
    } else {
        format!("{}: {}", status, body)
    };

    by_status(status, message)
}

/// Classify HTTP errors by category
pub fn classify_http_error(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 | 422 => "validation",
        401 => "authentication",
        403 => "authorization",
        404 => "not_found",
        408 => "timeout",
        429 => "rate_limit",
        500..=599 => "server",
        _ => "unknown",
    }
}

/// Determine if an HTTP status code indicates a retryable error
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 502 | 503 | 504)
}
