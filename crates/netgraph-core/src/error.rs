use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetGraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, NetGraphError>;

/// Error raised by the provider API boundary. The retry policy treats
/// throttling, timeout, and 5xx-class failures as retryable; everything
/// else terminates the call immediately.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("request throttled: {0}")]
    Throttled(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Throttled(_) | ProviderError::Timeout(_) | ProviderError::Unavailable(_)
        )
    }
}

/// Terminal failure for a single (region, resource type) collection.
/// Scoped to the collector manager's per-key failure map; never propagated
/// as a pipeline-level error.
#[derive(Error, Debug, Clone)]
pub enum CollectionError {
    #[error("provider call failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    #[error("fatal provider error: {0}")]
    Fatal(#[from] ProviderError),

    #[error("collection deadline exceeded")]
    DeadlineExceeded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ProviderError::Throttled("slow down".into()).is_retryable());
        assert!(ProviderError::Timeout("30s".into()).is_retryable());
        assert!(ProviderError::Unavailable("503".into()).is_retryable());
        assert!(!ProviderError::Auth("bad key".into()).is_retryable());
        assert!(!ProviderError::InvalidRequest("bad filter".into()).is_retryable());
        assert!(!ProviderError::MalformedResponse("not json".into()).is_retryable());
    }
}
