use crate::{evaluate_posture, PostureIssue, TopologyGraph};
use netgraph_core::{NetGraphError, RelationshipType, ResourceType, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Structural analysis over a finalized topology graph. All traversals
/// treat edges as undirected: a subnet is connected to its VPC regardless
/// of which way the containment edge points.
pub struct GraphAnalyzer<'a> {
    graph: &'a TopologyGraph,
}

#[derive(Debug, Clone, Serialize)]
pub struct VpcSummary {
    pub vpc_id: String,
    pub name: Option<String>,
    pub subnet_count: usize,
    pub instance_count: usize,
    pub has_internet_gateway: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubnetSummary {
    pub subnet_id: String,
    pub vpc_id: Option<String>,
    pub hosted_count: usize,
    pub maps_public_ips: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub node_count: usize,
    pub edge_count: usize,
    /// Node counts keyed by resource type name.
    pub by_type: BTreeMap<String, usize>,
    /// Node counts keyed by region.
    pub by_region: BTreeMap<String, usize>,
    pub component_count: usize,
    pub largest_component_size: usize,
    /// Full component membership, each component id-sorted.
    pub components: Vec<Vec<String>>,
    pub isolated_nodes: Vec<String>,
    pub vpcs: Vec<VpcSummary>,
    pub subnets: Vec<SubnetSummary>,
    /// Highest degree-centrality nodes, descending, ties by id.
    pub most_connected: Vec<(String, f64)>,
    /// Highest betweenness-centrality nodes; the graph's choke points.
    pub choke_points: Vec<(String, f64)>,
    /// Highest closeness-centrality nodes.
    pub most_central: Vec<(String, f64)>,
    /// Security posture checklist results, in check order.
    pub posture: Vec<PostureIssue>,
}

fn top_scores(scores: BTreeMap<String, f64>, n: usize) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    ranked.truncate(n);
    ranked
}

impl<'a> GraphAnalyzer<'a> {
    pub fn new(graph: &'a TopologyGraph) -> Self {
        Self { graph }
    }

    /// Weakly connected components. Each component's ids are sorted and the
    /// components themselves are ordered by their smallest member.
    pub fn connected_components(&self) -> Vec<Vec<String>> {
        let ids: Vec<&str> = self.graph.nodes().map(|n| n.id.as_str()).collect();
        let index: HashMap<&str, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut parent: Vec<usize> = (0..ids.len()).collect();

        fn find(parent: &mut Vec<usize>, mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }

        for edge in self.graph.edges() {
            let (a, b) = (index[edge.source_id.as_str()], index[edge.target_id.as_str()]);
            let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
            if ra != rb {
                parent[ra.max(rb)] = ra.min(rb);
            }
        }

        let mut components: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (i, id) in ids.iter().enumerate() {
            let root = find(&mut parent, i);
            components.entry(root).or_default().push(id.to_string());
        }
        let mut result: Vec<Vec<String>> = components.into_values().collect();
        for component in &mut result {
            component.sort_unstable();
        }
        result.sort_by(|a, b| a[0].cmp(&b[0]));
        result
    }

    /// Nodes with no incident edges at all.
    pub fn isolated_nodes(&self) -> Vec<String> {
        self.graph
            .nodes()
            .filter(|n| self.graph.degree(&n.id) == 0)
            .map(|n| n.id.clone())
            .collect()
    }

    /// Shortest undirected path between two nodes. Unknown endpoints are an
    /// error; an unreachable target is `None`. When every incident edge on
    /// the frontier carries a cost the search weighs them, otherwise each
    /// hop counts one.
    pub fn shortest_path(&self, from: &str, to: &str) -> Result<Option<Vec<String>>> {
        for endpoint in [from, to] {
            if !self.graph.contains_node(endpoint) {
                return Err(NetGraphError::NodeNotFound(endpoint.to_string()));
            }
        }
        if from == to {
            return Ok(Some(vec![from.to_string()]));
        }
        let weighted = self.graph.edges().iter().any(|e| e.cost.is_some());
        if weighted {
            self.dijkstra(from, to)
        } else {
            self.bfs(from, to)
        }
    }

    fn bfs(&self, from: &str, to: &str) -> Result<Option<Vec<String>>> {
        let mut predecessor: HashMap<String, String> = HashMap::new();
        let mut queue = VecDeque::from([from.to_string()]);
        predecessor.insert(from.to_string(), from.to_string());
        while let Some(current) = queue.pop_front() {
            for neighbor in self.graph.undirected_neighbors(&current) {
                if predecessor.contains_key(neighbor) {
                    continue;
                }
                predecessor.insert(neighbor.to_string(), current.clone());
                if neighbor == to {
                    return Ok(Some(Self::unwind(&predecessor, from, to)));
                }
                queue.push_back(neighbor.to_string());
            }
        }
        Ok(None)
    }

    fn dijkstra(&self, from: &str, to: &str) -> Result<Option<Vec<String>>> {
        use std::cmp::Reverse;
        use std::collections::BinaryHeap;

        // f64 costs are finite here; order by total distance in millis of
        // cost units scaled to u64 to keep the heap ordering total.
        let scale = |c: f64| (c.max(0.0) * 1_000.0) as u64;
        let mut distance: HashMap<String, u64> = HashMap::new();
        let mut predecessor: HashMap<String, String> = HashMap::new();
        let mut heap = BinaryHeap::new();
        distance.insert(from.to_string(), 0);
        heap.push(Reverse((0u64, from.to_string())));

        while let Some(Reverse((dist, current))) = heap.pop() {
            if current == to {
                return Ok(Some(Self::unwind(&predecessor, from, to)));
            }
            if distance.get(&current).copied().unwrap_or(u64::MAX) < dist {
                continue;
            }
            let incident = self
                .graph
                .out_edges(&current)
                .map(|e| (e.target_id.as_str(), e.cost))
                .chain(self.graph.in_edges(&current).map(|e| (e.source_id.as_str(), e.cost)));
            for (neighbor, cost) in incident {
                let next = dist + scale(cost.unwrap_or(1.0)).max(1);
                if next < distance.get(neighbor).copied().unwrap_or(u64::MAX) {
                    distance.insert(neighbor.to_string(), next);
                    predecessor.insert(neighbor.to_string(), current.clone());
                    heap.push(Reverse((next, neighbor.to_string())));
                }
            }
        }
        Ok(None)
    }

    fn unwind(predecessor: &HashMap<String, String>, from: &str, to: &str) -> Vec<String> {
        let mut path = vec![to.to_string()];
        let mut current = to.to_string();
        while current != from {
            current = predecessor[&current].clone();
            path.push(current.clone());
        }
        path.reverse();
        path
    }

    /// Degree centrality normalized by the maximum possible degree.
    pub fn degree_centrality(&self) -> BTreeMap<String, f64> {
        let n = self.graph.node_count();
        let denom = if n > 1 { (n - 1) as f64 } else { 1.0 };
        self.graph
            .nodes()
            .map(|node| (node.id.clone(), self.graph.degree(&node.id) as f64 / denom))
            .collect()
    }

    /// Betweenness centrality via Brandes' algorithm, undirected and
    /// unweighted.
    pub fn betweenness_centrality(&self) -> BTreeMap<String, f64> {
        let ids: Vec<String> = self.graph.nodes().map(|n| n.id.clone()).collect();
        let mut centrality: BTreeMap<String, f64> =
            ids.iter().map(|id| (id.clone(), 0.0)).collect();

        for source in &ids {
            let mut stack: Vec<String> = Vec::new();
            let mut predecessors: HashMap<String, Vec<String>> = HashMap::new();
            let mut sigma: HashMap<String, f64> = HashMap::new();
            let mut dist: HashMap<String, i64> = HashMap::new();
            sigma.insert(source.clone(), 1.0);
            dist.insert(source.clone(), 0);
            let mut queue = VecDeque::from([source.clone()]);

            while let Some(v) = queue.pop_front() {
                stack.push(v.clone());
                let dv = dist[&v];
                let sv = sigma[&v];
                for w in self.graph.undirected_neighbors(&v) {
                    if !dist.contains_key(w) {
                        dist.insert(w.to_string(), dv + 1);
                        queue.push_back(w.to_string());
                    }
                    if dist[w] == dv + 1 {
                        *sigma.entry(w.to_string()).or_insert(0.0) += sv;
                        predecessors.entry(w.to_string()).or_default().push(v.clone());
                    }
                }
            }

            let mut delta: HashMap<String, f64> = HashMap::new();
            while let Some(w) = stack.pop() {
                let dw = delta.get(&w).copied().unwrap_or(0.0);
                if let Some(preds) = predecessors.get(&w) {
                    for v in preds {
                        let share = sigma[v] / sigma[&w] * (1.0 + dw);
                        *delta.entry(v.clone()).or_insert(0.0) += share;
                    }
                }
                if &w != source {
                    if let Some(score) = centrality.get_mut(&w) {
                        *score += dw;
                    }
                }
            }
        }

        // Each undirected pair was counted from both endpoints.
        for value in centrality.values_mut() {
            *value /= 2.0;
        }
        centrality
    }

    /// Closeness centrality: inverse mean shortest-path distance to the
    /// reachable part of the graph, scaled by reachable fraction.
    pub fn closeness_centrality(&self) -> BTreeMap<String, f64> {
        let n = self.graph.node_count();
        let mut centrality = BTreeMap::new();
        for node in self.graph.nodes() {
            let mut dist: HashMap<&str, usize> = HashMap::new();
            dist.insert(&node.id, 0);
            let mut queue = VecDeque::from([node.id.as_str()]);
            let mut total = 0usize;
            while let Some(current) = queue.pop_front() {
                let d = dist[current];
                for neighbor in self.graph.undirected_neighbors(current) {
                    if !dist.contains_key(neighbor) {
                        dist.insert(neighbor, d + 1);
                        total += d + 1;
                        queue.push_back(neighbor);
                    }
                }
            }
            let reachable = dist.len() - 1;
            let value = if reachable == 0 || total == 0 {
                0.0
            } else {
                let fraction = reachable as f64 / (n.max(2) - 1) as f64;
                fraction * reachable as f64 / total as f64
            };
            centrality.insert(node.id.clone(), value);
        }
        centrality
    }

    /// Per-VPC rollups for reports.
    pub fn vpc_summaries(&self) -> Vec<VpcSummary> {
        self.graph
            .nodes_of_type(&ResourceType::Vpc)
            .map(|vpc| {
                let subnets: Vec<&str> = self
                    .graph
                    .out_edges(&vpc.id)
                    .filter(|e| e.kind == RelationshipType::Contains)
                    .filter(|e| {
                        self.graph
                            .node(&e.target_id)
                            .is_some_and(|n| n.resource_type == ResourceType::Subnet)
                    })
                    .map(|e| e.target_id.as_str())
                    .collect();
                let instance_count = subnets
                    .iter()
                    .flat_map(|s| self.graph.out_edges(s))
                    .filter(|e| e.kind == RelationshipType::Hosts)
                    .filter(|e| {
                        self.graph
                            .node(&e.target_id)
                            .is_some_and(|n| n.resource_type == ResourceType::ComputeInstance)
                    })
                    .count();
                let has_internet_gateway = self
                    .graph
                    .in_edges(&vpc.id)
                    .any(|e| e.kind == RelationshipType::AttachedTo);
                VpcSummary {
                    vpc_id: vpc.id.clone(),
                    name: vpc.name.clone(),
                    subnet_count: subnets.len(),
                    instance_count,
                    has_internet_gateway,
                }
            })
            .collect()
    }

    pub fn subnet_summaries(&self) -> Vec<SubnetSummary> {
        self.graph
            .nodes_of_type(&ResourceType::Subnet)
            .map(|subnet| SubnetSummary {
                subnet_id: subnet.id.clone(),
                vpc_id: subnet.attr_str("vpc_id").map(str::to_string),
                hosted_count: self
                    .graph
                    .out_edges(&subnet.id)
                    .filter(|e| e.kind == RelationshipType::Hosts)
                    .count(),
                maps_public_ips: subnet.attr_bool("map_public_ip_on_launch").unwrap_or(false),
            })
            .collect()
    }

    pub fn summarize(&self, top_n: usize) -> AnalysisSummary {
        let components = self.connected_components();
        let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_region: BTreeMap<String, usize> = BTreeMap::new();
        for node in self.graph.nodes() {
            *by_type.entry(node.resource_type.to_string()).or_default() += 1;
            *by_region.entry(node.region.clone()).or_default() += 1;
        }
        AnalysisSummary {
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            by_type,
            by_region,
            component_count: components.len(),
            largest_component_size: components.iter().map(Vec::len).max().unwrap_or(0),
            isolated_nodes: self.isolated_nodes(),
            vpcs: self.vpc_summaries(),
            subnets: self.subnet_summaries(),
            most_connected: top_scores(self.degree_centrality(), top_n),
            choke_points: top_scores(self.betweenness_centrality(), top_n),
            most_central: top_scores(self.closeness_centrality(), top_n),
            posture: evaluate_posture(self.graph),
            components,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgraph_core::{Relationship, ResourceRecord};

    fn graph_from(
        nodes: &[(&str, ResourceType)],
        edges: &[(&str, &str, RelationshipType)],
    ) -> TopologyGraph {
        let mut graph = TopologyGraph::new();
        for (id, resource_type) in nodes {
            graph.insert_node(ResourceRecord::new(*id, resource_type.clone(), "us-east-1"));
        }
        for (source, target, kind) in edges {
            graph
                .add_edge(Relationship::new(*source, *target, kind.clone()))
                .unwrap();
        }
        graph.finalize();
        graph
    }

    fn chain() -> TopologyGraph {
        graph_from(
            &[
                ("a", ResourceType::Vpc),
                ("b", ResourceType::Subnet),
                ("c", ResourceType::ComputeInstance),
                ("lonely", ResourceType::DedicatedLink),
            ],
            &[
                ("a", "b", RelationshipType::Contains),
                ("b", "c", RelationshipType::Hosts),
            ],
        )
    }

    #[test]
    fn components_and_isolated() {
        let graph = chain();
        let analyzer = GraphAnalyzer::new(&graph);
        let components = analyzer.connected_components();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0], vec!["a", "b", "c"]);
        assert_eq!(components[1], vec!["lonely"]);
        assert_eq!(analyzer.isolated_nodes(), vec!["lonely"]);
    }

    #[test]
    fn shortest_path_follows_edges_undirected() {
        let graph = chain();
        let analyzer = GraphAnalyzer::new(&graph);
        // Against edge direction.
        let path = analyzer.shortest_path("c", "a").unwrap().unwrap();
        assert_eq!(path, vec!["c", "b", "a"]);
        assert!(analyzer.shortest_path("a", "lonely").unwrap().is_none());
        assert!(matches!(
            analyzer.shortest_path("a", "ghost"),
            Err(NetGraphError::NodeNotFound(_))
        ));
        assert_eq!(analyzer.shortest_path("a", "a").unwrap().unwrap(), vec!["a"]);
    }

    #[test]
    fn weighted_path_prefers_cheap_detour() {
        let mut graph = TopologyGraph::new();
        for id in ["a", "b", "c"] {
            graph.insert_node(ResourceRecord::new(id, ResourceType::Vpc, "us-east-1"));
        }
        graph
            .add_edge(Relationship::new("a", "c", RelationshipType::ConnectsTo).with_cost(10.0))
            .unwrap();
        graph
            .add_edge(Relationship::new("a", "b", RelationshipType::ConnectsTo).with_cost(1.0))
            .unwrap();
        graph
            .add_edge(Relationship::new("b", "c", RelationshipType::ConnectsTo).with_cost(1.0))
            .unwrap();
        graph.finalize();
        let analyzer = GraphAnalyzer::new(&graph);
        let path = analyzer.shortest_path("a", "c").unwrap().unwrap();
        assert_eq!(path, vec!["a", "b", "c"]);
    }

    #[test]
    fn degree_centrality_peaks_at_hub() {
        let graph = graph_from(
            &[
                ("hub", ResourceType::TransitGateway),
                ("v1", ResourceType::Vpc),
                ("v2", ResourceType::Vpc),
                ("v3", ResourceType::Vpc),
            ],
            &[
                ("hub", "v1", RelationshipType::ConnectsTo),
                ("hub", "v2", RelationshipType::ConnectsTo),
                ("hub", "v3", RelationshipType::ConnectsTo),
            ],
        );
        let centrality = GraphAnalyzer::new(&graph).degree_centrality();
        assert_eq!(centrality["hub"], 1.0);
        assert!(centrality["v1"] < centrality["hub"]);
    }

    #[test]
    fn betweenness_peaks_at_bridge() {
        let graph = graph_from(
            &[
                ("a", ResourceType::Vpc),
                ("bridge", ResourceType::TransitGateway),
                ("b", ResourceType::Vpc),
            ],
            &[
                ("a", "bridge", RelationshipType::ConnectsTo),
                ("bridge", "b", RelationshipType::ConnectsTo),
            ],
        );
        let centrality = GraphAnalyzer::new(&graph).betweenness_centrality();
        assert!(centrality["bridge"] > centrality["a"]);
        assert_eq!(centrality["a"], 0.0);
    }

    #[test]
    fn summary_counts_vpc_contents() {
        let mut graph = TopologyGraph::new();
        graph.insert_node(ResourceRecord::new("vpc-1", ResourceType::Vpc, "us-east-1"));
        graph.insert_node(
            ResourceRecord::new("subnet-1", ResourceType::Subnet, "us-east-1")
                .with_attr("vpc_id", serde_json::json!("vpc-1")),
        );
        graph.insert_node(ResourceRecord::new("i-1", ResourceType::ComputeInstance, "eu-west-1"));
        graph.insert_node(ResourceRecord::new("igw-1", ResourceType::InternetGateway, "us-east-1"));
        for (source, target, kind) in [
            ("vpc-1", "subnet-1", RelationshipType::Contains),
            ("subnet-1", "i-1", RelationshipType::Hosts),
            ("igw-1", "vpc-1", RelationshipType::AttachedTo),
        ] {
            graph.add_edge(Relationship::new(source, target, kind)).unwrap();
        }
        graph.finalize();

        let summary = GraphAnalyzer::new(&graph).summarize(3);
        assert_eq!(summary.component_count, 1);
        assert_eq!(summary.by_type["vpc"], 1);
        assert_eq!(summary.by_type["compute_instance"], 1);
        assert_eq!(summary.by_region["eu-west-1"], 1);
        assert_eq!(summary.by_region["us-east-1"], 3);
        assert_eq!(summary.components[0], vec!["i-1", "igw-1", "subnet-1", "vpc-1"]);
        let vpc = &summary.vpcs[0];
        assert_eq!(vpc.subnet_count, 1);
        assert_eq!(vpc.instance_count, 1);
        assert!(vpc.has_internet_gateway);
        assert_eq!(summary.subnets.len(), 1);
        assert_eq!(summary.subnets[0].vpc_id.as_deref(), Some("vpc-1"));
        assert_eq!(summary.subnets[0].hosted_count, 1);
        assert_eq!(summary.most_connected.len(), 3);
        assert!(summary.choke_points[0].1 > 0.0);
        assert_eq!(summary.most_central.len(), 3);
        assert!(summary.posture.contains(&PostureIssue::UnprotectedCompute {
            instance_id: "i-1".into()
        }));
    }
}
