use crate::{CollectionError, ProviderError, ResourceRecord, ResourceType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result type for model-assisted analysis operations.
pub type ModelResult<T> = anyhow::Result<T>;

/// One page of raw provider items plus the continuation token, if any.
#[derive(Debug, Clone, Default)]
pub struct ResourcePage {
    pub items: Vec<Value>,
    pub next_token: Option<String>,
}

/// Boundary to the cloud provider API. Implementations are rate-limited
/// and paginated upstream; this trait only models a single page fetch.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn list_page(
        &self,
        resource_type: &ResourceType,
        region: &str,
        page_token: Option<&str>,
    ) -> std::result::Result<ResourcePage, ProviderError>;
}

/// Outcome of one collector invocation. A mid-pagination fatal error
/// returns the records gathered so far alongside the error; already
/// fetched data is never discarded.
#[derive(Debug)]
pub struct CollectionOutcome {
    pub records: Vec<ResourceRecord>,
    pub error: Option<CollectionError>,
}

impl CollectionOutcome {
    pub fn ok(records: Vec<ResourceRecord>) -> Self {
        Self {
            records,
            error: None,
        }
    }

    pub fn partial(records: Vec<ResourceRecord>, error: CollectionError) -> Self {
        Self {
            records,
            error: Some(error),
        }
    }

    pub fn failed(error: CollectionError) -> Self {
        Self {
            records: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// One collector per resource kind: fetches, drains pagination, and
/// normalizes a single resource type for a single region.
#[async_trait]
pub trait Collector: Send + Sync {
    fn resource_type(&self) -> ResourceType;

    /// Logical provider service the collector talks to; used as half of
    /// the rate limiter key.
    fn service(&self) -> &'static str;

    async fn collect(&self, region: &str) -> CollectionOutcome;
}

/// Candidate finding returned by the external model pass, before it is
/// validated and converted into an `Anomaly`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFinding {
    #[serde(alias = "type")]
    pub kind: String,
    pub severity: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "affected_ids")]
    pub affected_resources: Vec<String>,
    #[serde(default, alias = "confidence_score")]
    pub confidence: f64,
    #[serde(default)]
    pub remediation: Option<String>,
}

/// Boundary to the model-assisted analysis service: one bounded-size
/// topology digest in, zero or more candidate findings out. Callers treat
/// every failure as a recoverable degradation.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn analyze_topology(&self, digest: &Value) -> ModelResult<Vec<ModelFinding>>;
}
