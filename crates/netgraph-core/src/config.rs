use crate::{NetGraphError, ResourceType, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry behavior for a single provider call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempt budget, including the first call.
    #[serde(default = "RetryConfig::default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff delay; attempt n waits min(base * 2^n, max) plus jitter.
    #[serde(default = "RetryConfig::default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "RetryConfig::default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl RetryConfig {
    fn default_max_attempts() -> u32 {
        3
    }

    fn default_base_delay_ms() -> u64 {
        1_000
    }

    fn default_max_delay_ms() -> u64 {
        60_000
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            base_delay_ms: Self::default_base_delay_ms(),
            max_delay_ms: Self::default_max_delay_ms(),
        }
    }
}

/// Token-bucket parameters applied per (service, region) key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "RateLimitConfig::default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default = "RateLimitConfig::default_burst")]
    pub burst: u32,
}

impl RateLimitConfig {
    fn default_requests_per_second() -> u32 {
        50
    }

    fn default_burst() -> u32 {
        10
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: Self::default_requests_per_second(),
            burst: Self::default_burst(),
        }
    }
}

/// Settings for the model-assisted anomaly pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub endpoint: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "ModelConfig::default_model_id")]
    pub model_id: String,
    #[serde(default = "ModelConfig::default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "ModelConfig::default_temperature")]
    pub temperature: f32,
    #[serde(default = "ModelConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ModelConfig {
    fn default_model_id() -> String {
        "topology-analyst-v1".to_string()
    }

    fn default_max_tokens() -> usize {
        4096
    }

    fn default_temperature() -> f32 {
        0.0
    }

    fn default_timeout_secs() -> u64 {
        60
    }
}

/// Top-level configuration for one discovery run, constructed once at the
/// entry point and passed into each component. There is no ambient global
/// settings object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub regions: Vec<String>,
    pub resource_types: Vec<ResourceType>,
    #[serde(default = "DiscoveryConfig::default_concurrency_limit")]
    pub concurrency_limit: usize,
    /// Overall deadline for the collection phase.
    #[serde(default = "DiscoveryConfig::default_deadline_secs")]
    pub deadline_secs: u64,
    #[serde(default)]
    pub ai_enabled: bool,
    /// Cap on the serialized topology digest handed to the model pass.
    #[serde(default = "DiscoveryConfig::default_max_digest_chars")]
    pub max_digest_chars: usize,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelConfig>,
}

impl DiscoveryConfig {
    fn default_concurrency_limit() -> usize {
        10
    }

    fn default_deadline_secs() -> u64 {
        900
    }

    fn default_max_digest_chars() -> usize {
        16_000
    }

    pub fn new(regions: Vec<String>, resource_types: Vec<ResourceType>) -> Self {
        Self {
            regions,
            resource_types,
            concurrency_limit: Self::default_concurrency_limit(),
            deadline_secs: Self::default_deadline_secs(),
            ai_enabled: false,
            max_digest_chars: Self::default_max_digest_chars(),
            retry: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            model: None,
        }
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    /// Pipeline-fatal validation, checked before any collection starts.
    pub fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(NetGraphError::Config("region list is empty".into()));
        }
        if self.resource_types.is_empty() {
            return Err(NetGraphError::Config("resource type list is empty".into()));
        }
        if self.concurrency_limit == 0 {
            return Err(NetGraphError::Config("concurrency limit must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(NetGraphError::Config("retry attempt budget must be at least 1".into()));
        }
        if self.rate_limit.requests_per_second == 0 || self.rate_limit.burst == 0 {
            return Err(NetGraphError::Config(
                "rate limit refill rate and burst must be non-zero".into(),
            ));
        }
        if self.ai_enabled {
            if let Some(model) = &self.model {
                if model.endpoint.is_empty() {
                    return Err(NetGraphError::Config("model endpoint is empty".into()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_regions_rejected() {
        let config = DiscoveryConfig::new(vec![], vec![ResourceType::Vpc]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_resource_types_rejected() {
        let config = DiscoveryConfig::new(vec!["us-east-1".into()], vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_concurrency_rejected() {
        let mut config = DiscoveryConfig::new(vec!["us-east-1".into()], vec![ResourceType::Vpc]);
        config.concurrency_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_validate() {
        let config = DiscoveryConfig::new(vec!["us-east-1".into()], ResourceType::all());
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.deadline(), Duration::from_secs(900));
    }
}
