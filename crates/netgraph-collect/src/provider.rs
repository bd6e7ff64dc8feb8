use async_trait::async_trait;
use netgraph_core::{ProviderClient, ProviderError, ResourcePage, ResourceType};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Connection settings for the HTTP provider API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub endpoint: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "ProviderConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "ProviderConfig::default_page_size")]
    pub page_size: usize,
}

impl ProviderConfig {
    fn default_timeout_secs() -> u64 {
        30
    }

    fn default_page_size() -> usize {
        100
    }
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
    #[serde(default)]
    next_token: Option<String>,
}

/// HTTP-backed provider client. One GET per page; the caller owns rate
/// limiting and retries.
pub struct HttpProviderClient {
    config: ProviderConfig,
    client: Client,
}

impl HttpProviderClient {
    pub fn new(config: ProviderConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    fn classify_status(status: StatusCode, body: String) -> ProviderError {
        match status {
            StatusCode::TOO_MANY_REQUESTS => ProviderError::Throttled(body),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                ProviderError::Timeout(body)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth(body),
            s if s.is_server_error() => ProviderError::Unavailable(format!("{}: {}", s, body)),
            s => ProviderError::InvalidRequest(format!("{}: {}", s, body)),
        }
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn list_page(
        &self,
        resource_type: &ResourceType,
        region: &str,
        page_token: Option<&str>,
    ) -> Result<ResourcePage, ProviderError> {
        let url = format!(
            "{}/v1/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            region,
            resource_type
        );

        let mut request = self
            .client
            .get(&url)
            .header("x-api-key", &self.config.api_key)
            .query(&[("page_size", self.config.page_size.to_string())]);
        if let Some(token) = page_token {
            request = request.query(&[("page_token", token)]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, body));
        }

        let page: PageResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        debug!(
            resource_type = %resource_type,
            region,
            items = page.items.len(),
            has_next = page.next_token.is_some(),
            "fetched provider page"
        );

        Ok(ResourcePage {
            items: page.items,
            next_token: page.next_token,
        })
    }
}
