use crate::RelationshipType;
use serde::{Deserialize, Serialize};

/// Directed, typed edge between two resource records. Both endpoints must
/// exist in the same run's record set; the graph builder drops references
/// to absent targets and records a diagnostic instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source_id: String,
    pub target_id: String,
    pub kind: RelationshipType,
    /// Optional traversal cost; when every edge on a query path carries one,
    /// shortest-path switches from BFS to Dijkstra.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

impl Relationship {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        kind: RelationshipType,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind,
            cost: None,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Ordering key used to keep edge sets deterministic.
    pub fn sort_key(&self) -> (&str, &str, &RelationshipType) {
        (&self.source_id, &self.target_id, &self.kind)
    }
}
