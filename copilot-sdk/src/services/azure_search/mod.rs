//! Azure AI Search client
//!
//! Runs keyword, vector and semantic queries against a search index.
//! The document type is chosen by the caller.

mod models;
pub use models::*;

use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::{AzureSearchConfig, ConfigProvider, ServiceConfig};
use crate::core::{AuthenticatedClient, ServiceClient};
use crate::error::{ErrorDetails, Result, ServiceError};
use crate::resilience::Resilience;
use crate::services::common::{build_http_client, read_json, UserAgent};

const SERVICE: &str = "azure_search";

#[derive(Debug, Clone)]
pub struct AzureSearchClient {
    http_client: Client,
    config: AzureSearchConfig,
    resilience: Resilience,
}

impl AzureSearchClient {
    pub fn new(config: AzureSearchConfig) -> Result<Self> {
        config.validate()?;

        let http_client = build_http_client(
            UserAgent::for_client("azure-search"),
            Duration::from_secs(config.timeout_seconds),
        )?;

        Ok(Self {
            http_client,
            config,
            resilience: Resilience::named(SERVICE),
        })
    }

    /// Build a client from configuration keys (`azure_search_*`)
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        Self::new(AzureSearchConfig::from_provider(provider)?)
    }

    pub fn with_resilience(mut self, resilience: Resilience) -> Self {
        self.resilience = resilience;
        self
    }

    pub fn search_url(&self, index: &str) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            index,
            self.config.api_version
        )
    }

    /// Run `request` against `index`, decoding hits as `D`
    pub async fn search<D>(&self, index: &str, request: &SearchRequest) -> Result<Vec<SearchHit<D>>>
    where
        D: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        self.apply_auth(&mut headers)?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let url = self.search_url(index);
        let (url, headers, client) = (url.as_str(), &headers, &self.http_client);

        let response: SearchResponse<D> = self
            .resilience
            .execute(move || async move {
                debug!("Searching index {}: '{}'", index, request.search);
                let response = client
                    .post(url)
                    .headers(headers.clone())
                    .json(request)
                    .send()
                    .await?;
                read_json(SERVICE, url, response).await
            })
            .await?;

        Ok(response.value)
    }
}

impl ServiceClient for AzureSearchClient {
    fn name(&self) -> &str {
        SERVICE
    }

    fn base_url(&self) -> &str {
        &self.config.endpoint
    }
}

impl AuthenticatedClient for AzureSearchClient {
    fn auth_type(&self) -> &str {
        "api-key"
    }

    fn is_authenticated(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    fn apply_auth(&self, headers: &mut HeaderMap) -> Result<()> {
        if !self.is_authenticated() {
            return Err(ServiceError::authentication("No Azure AI Search API key configured")
                .with_context(ErrorDetails::for_service(SERVICE)));
        }

        let value = HeaderValue::from_str(&self.config.api_key)
            .map_err(|_| ServiceError::configuration("API key contains invalid header characters"))?;
        headers.insert("api-key", value);
        Ok(())
    }
}
