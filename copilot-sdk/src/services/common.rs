//! Common utilities for service clients

use std::fmt;
use std::time::Duration;

use reqwest::{header, Client, Response};

use crate::error::{mapping, ErrorDetails, Result, ServiceError};

/// UserAgent structure for identifying the client to upstream services
#[derive(Debug, Clone)]
pub struct UserAgent {
    pub app_name: String,
    pub version: String,
    pub extra: Option<String>,
}

impl UserAgent {
    /// User agent for one of this crate's clients
    pub fn for_client(client: &str) -> Self {
        Self {
            extra: Some(client.to_string()),
            ..Self::default()
        }
    }
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            app_name: "teamsfx-fix".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: None,
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.version)?;
        if let Some(ref extra) = self.extra {
            write!(f, " ({})", extra)?;
        }
        Ok(())
    }
}

/// Build an HTTP client with the user agent, timeout and compression set
pub fn build_http_client(user_agent: UserAgent, timeout: Duration) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(&user_agent.to_string())
            .map_err(|e| ServiceError::configuration(format!("Invalid user agent: {}", e)))?,
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .gzip(true)
        .build()
        .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Convert a non-success response into a categorized error
pub async fn parse_error_response(service_name: &str, endpoint: &str, response: Response) -> ServiceError {
    let status = response.status();
    let mut details = ErrorDetails::for_service(service_name)
        .status_code(status.as_u16())
        .endpoint(crate::util::sanitize_for_logging(endpoint));

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("Failed to read error response: {}", e),
    };

    mapping::map_http_error(status, &body, &mut details).with_context(details)
}

/// Read a JSON body, or turn a failed response into an error
pub async fn read_json<R>(service_name: &str, endpoint: &str, response: Response) -> Result<R>
where
    R: serde::de::DeserializeOwned,
{
    if !response.status().is_success() {
        return Err(parse_error_response(service_name, endpoint, response).await);
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        ServiceError::parsing(format!("Failed to parse response: {}", e)).with_context(
            ErrorDetails::for_service(service_name).endpoint(crate::util::sanitize_for_logging(endpoint)),
        )
    })
}
