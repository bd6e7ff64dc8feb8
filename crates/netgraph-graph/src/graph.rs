use netgraph_core::{NetGraphError, Relationship, RelationshipType, ResourceRecord, ResourceType, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Directed multigraph over discovered resources. Nodes are keyed by
/// resource id in a sorted map so every traversal order is deterministic;
/// edges are held sorted and deduplicated after `finalize`.
#[derive(Debug, Default)]
pub struct TopologyGraph {
    nodes: BTreeMap<String, ResourceRecord>,
    edges: Vec<Relationship>,
    out_adjacency: HashMap<String, Vec<usize>>,
    in_adjacency: HashMap<String, Vec<usize>>,
    finalized: bool,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node; returns false if the id was already present, leaving
    /// the existing record untouched.
    pub fn insert_node(&mut self, record: ResourceRecord) -> bool {
        if self.nodes.contains_key(&record.id) {
            return false;
        }
        self.nodes.insert(record.id.clone(), record);
        self.finalized = false;
        true
    }

    /// Add an edge between two existing nodes. Both endpoints must already
    /// be in the graph.
    pub fn add_edge(&mut self, edge: Relationship) -> Result<()> {
        for endpoint in [&edge.source_id, &edge.target_id] {
            if !self.nodes.contains_key(endpoint) {
                return Err(NetGraphError::NodeNotFound(endpoint.clone()));
            }
        }
        self.edges.push(edge);
        self.finalized = false;
        Ok(())
    }

    /// Sort and deduplicate edges, then rebuild adjacency. Idempotent.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.edges.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.edges.dedup_by(|a, b| a.sort_key() == b.sort_key());
        self.out_adjacency.clear();
        self.in_adjacency.clear();
        for (index, edge) in self.edges.iter().enumerate() {
            self.out_adjacency
                .entry(edge.source_id.clone())
                .or_default()
                .push(index);
            self.in_adjacency
                .entry(edge.target_id.clone())
                .or_default()
                .push(index);
        }
        self.finalized = true;
    }

    pub fn node(&self, id: &str) -> Option<&ResourceRecord> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.nodes.values()
    }

    pub fn nodes_of_type<'a>(
        &'a self,
        resource_type: &'a ResourceType,
    ) -> impl Iterator<Item = &'a ResourceRecord> + 'a {
        self.nodes
            .values()
            .filter(move |n| &n.resource_type == resource_type)
    }

    pub fn edges(&self) -> &[Relationship] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn out_edges(&self, id: &str) -> impl Iterator<Item = &Relationship> {
        self.out_adjacency
            .get(id)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
    }

    pub fn in_edges(&self, id: &str) -> impl Iterator<Item = &Relationship> {
        self.in_adjacency
            .get(id)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
    }

    /// Neighbor ids ignoring edge direction, deduplicated and sorted.
    pub fn undirected_neighbors(&self, id: &str) -> Vec<&str> {
        let mut neighbors: Vec<&str> = self
            .out_edges(id)
            .map(|e| e.target_id.as_str())
            .chain(self.in_edges(id).map(|e| e.source_id.as_str()))
            .collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    pub fn degree(&self, id: &str) -> usize {
        self.out_adjacency.get(id).map_or(0, Vec::len)
            + self.in_adjacency.get(id).map_or(0, Vec::len)
    }

    /// True when any incoming edge of the given kind exists.
    pub fn has_incoming(&self, id: &str, kind: &RelationshipType) -> bool {
        self.in_edges(id).any(|e| &e.kind == kind)
    }

    pub fn export(&self) -> GraphExport {
        GraphExport {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.clone(),
        }
    }
}

/// Serializable snapshot of the graph for downstream consumers.
#[derive(Debug, Clone, Serialize)]
pub struct GraphExport {
    pub node_count: usize,
    pub edge_count: usize,
    pub nodes: Vec<ResourceRecord>,
    pub edges: Vec<Relationship>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgraph_core::RelationshipType;

    fn record(id: &str, resource_type: ResourceType) -> ResourceRecord {
        ResourceRecord::new(id, resource_type, "us-east-1")
    }

    fn sample_graph() -> TopologyGraph {
        let mut graph = TopologyGraph::new();
        graph.insert_node(record("vpc-1", ResourceType::Vpc));
        graph.insert_node(record("subnet-1", ResourceType::Subnet));
        graph.insert_node(record("i-1", ResourceType::ComputeInstance));
        graph
            .add_edge(Relationship::new("vpc-1", "subnet-1", RelationshipType::Contains))
            .unwrap();
        graph
            .add_edge(Relationship::new("subnet-1", "i-1", RelationshipType::Hosts))
            .unwrap();
        graph.finalize();
        graph
    }

    #[test]
    fn duplicate_node_insert_keeps_first() {
        let mut graph = TopologyGraph::new();
        let first = record("vpc-1", ResourceType::Vpc).with_name("first".to_string());
        let second = record("vpc-1", ResourceType::Vpc).with_name("second".to_string());
        assert!(graph.insert_node(first));
        assert!(!graph.insert_node(second));
        assert_eq!(graph.node("vpc-1").unwrap().name.as_deref(), Some("first"));
    }

    #[test]
    fn edge_to_missing_node_is_rejected() {
        let mut graph = TopologyGraph::new();
        graph.insert_node(record("vpc-1", ResourceType::Vpc));
        let err = graph
            .add_edge(Relationship::new("vpc-1", "ghost", RelationshipType::Contains))
            .unwrap_err();
        assert!(matches!(err, NetGraphError::NodeNotFound(_)));
    }

    #[test]
    fn finalize_deduplicates_and_sorts_edges() {
        let mut graph = TopologyGraph::new();
        graph.insert_node(record("a", ResourceType::Vpc));
        graph.insert_node(record("b", ResourceType::Subnet));
        graph
            .add_edge(Relationship::new("b", "a", RelationshipType::DependsOn))
            .unwrap();
        graph
            .add_edge(Relationship::new("a", "b", RelationshipType::Contains))
            .unwrap();
        graph
            .add_edge(Relationship::new("a", "b", RelationshipType::Contains))
            .unwrap();
        graph.finalize();
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edges()[0].source_id, "a");
    }

    #[test]
    fn adjacency_and_degree() {
        let graph = sample_graph();
        assert_eq!(graph.degree("subnet-1"), 2);
        assert_eq!(graph.undirected_neighbors("subnet-1"), vec!["i-1", "vpc-1"]);
        assert!(graph.has_incoming("i-1", &RelationshipType::Hosts));
        assert!(!graph.has_incoming("i-1", &RelationshipType::Protects));
    }
}
