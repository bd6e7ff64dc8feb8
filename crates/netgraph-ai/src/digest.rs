use netgraph_graph::{AnalysisSummary, TopologyGraph};
use serde_json::{json, Value};

/// Bounded JSON digest of the topology handed to the model. The model sees
/// node identity and typing plus the edge list; bulky attributes stay home.
#[derive(Debug, Clone)]
pub struct TopologyDigest {
    value: Value,
    truncated: bool,
}

impl TopologyDigest {
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

pub struct DigestBuilder {
    max_chars: usize,
}

impl DigestBuilder {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1_000),
        }
    }

    /// Build a digest that serializes to at most the character budget.
    /// Nodes and edges are emitted in graph order (id-sorted, edge-sorted),
    /// so truncation always drops the same tail for the same graph. When the
    /// analysis summary alone would eat more than half the budget, its
    /// per-resource lists are dropped and only the scalar counts remain.
    pub fn build(&self, graph: &TopologyGraph, summary: &AnalysisSummary) -> TopologyDigest {
        let nodes: Vec<Value> = graph
            .nodes()
            .map(|n| {
                json!({
                    "id": n.id,
                    "type": n.resource_type.to_string(),
                    "region": n.region,
                    "name": n.name,
                })
            })
            .collect();
        let edges: Vec<Value> = graph
            .edges()
            .iter()
            .map(|e| json!([e.source_id, e.kind.to_string(), e.target_id]))
            .collect();

        let full_summary = serde_json::to_value(summary).unwrap_or(Value::Null);
        let summary_cut = full_summary.to_string().len() > self.max_chars / 2;
        let summary_value = if summary_cut {
            json!({
                "node_count": summary.node_count,
                "edge_count": summary.edge_count,
                "component_count": summary.component_count,
                "largest_component_size": summary.largest_component_size,
            })
        } else {
            full_summary
        };

        let mut node_limit = nodes.len();
        let mut edge_limit = edges.len();
        loop {
            let truncated = summary_cut || node_limit < nodes.len() || edge_limit < edges.len();
            let value = json!({
                "summary": summary_value,
                "nodes": &nodes[..node_limit],
                "edges": &edges[..edge_limit],
                "truncated": truncated,
            });
            let size = value.to_string().len();
            if size <= self.max_chars || (node_limit == 0 && edge_limit == 0) {
                return TopologyDigest { value, truncated };
            }
            node_limit /= 2;
            edge_limit /= 2;
        }
    }
}
