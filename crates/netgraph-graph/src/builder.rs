use crate::TopologyGraph;
use netgraph_core::{Diagnostic, Relationship, RelationshipType, ResourceRecord, ResourceType};
use tracing::debug;

/// Which way the inferred edge points relative to the record carrying the
/// reference attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeDirection {
    /// referenced resource -> record (a subnet's vpc_id means the VPC
    /// contains the subnet)
    ReferencedToRecord,
    /// record -> referenced resource (a route table's subnet_ids mean the
    /// table routes to those subnets)
    RecordToReferenced,
}

struct InferenceRule {
    source_type: ResourceType,
    attribute: &'static str,
    kind: RelationshipType,
    direction: EdgeDirection,
    list: bool,
}

impl InferenceRule {
    const fn single(
        source_type: ResourceType,
        attribute: &'static str,
        kind: RelationshipType,
        direction: EdgeDirection,
    ) -> Self {
        Self {
            source_type,
            attribute,
            kind,
            direction,
            list: false,
        }
    }

    const fn list(
        source_type: ResourceType,
        attribute: &'static str,
        kind: RelationshipType,
        direction: EdgeDirection,
    ) -> Self {
        Self {
            source_type,
            attribute,
            kind,
            direction,
            list: true,
        }
    }
}

/// The fixed rule table mapping normalized reference attributes to typed
/// edges. Evaluation order is the table order, which keeps edge inference
/// deterministic for identical inputs.
fn inference_rules() -> Vec<InferenceRule> {
    use EdgeDirection::{RecordToReferenced, ReferencedToRecord};
    use RelationshipType::*;
    use ResourceType::*;

    vec![
        InferenceRule::single(Subnet, "vpc_id", Contains, ReferencedToRecord),
        InferenceRule::single(ComputeInstance, "subnet_id", Hosts, ReferencedToRecord),
        InferenceRule::list(ComputeInstance, "security_group_ids", Protects, ReferencedToRecord),
        InferenceRule::list(InternetGateway, "attached_vpc_ids", AttachedTo, RecordToReferenced),
        InferenceRule::single(SecurityGroup, "vpc_id", Contains, ReferencedToRecord),
        InferenceRule::single(NatGateway, "vpc_id", Contains, ReferencedToRecord),
        InferenceRule::single(NatGateway, "subnet_id", Hosts, ReferencedToRecord),
        InferenceRule::single(RouteTable, "vpc_id", Contains, ReferencedToRecord),
        InferenceRule::list(RouteTable, "subnet_ids", RoutesTo, RecordToReferenced),
        InferenceRule::single(NetworkAcl, "vpc_id", Contains, ReferencedToRecord),
        InferenceRule::list(NetworkAcl, "subnet_ids", Protects, RecordToReferenced),
        InferenceRule::single(VpcPeering, "requester_vpc_id", PeersWith, ReferencedToRecord),
        InferenceRule::single(VpcPeering, "accepter_vpc_id", PeersWith, RecordToReferenced),
        InferenceRule::single(VpnConnection, "transit_gateway_id", AttachedTo, RecordToReferenced),
        InferenceRule::list(TransitGateway, "attached_vpc_ids", ConnectsTo, RecordToReferenced),
        InferenceRule::single(LoadBalancer, "vpc_id", Contains, ReferencedToRecord),
        InferenceRule::list(LoadBalancer, "subnet_ids", Hosts, ReferencedToRecord),
        InferenceRule::list(LoadBalancer, "security_group_ids", Protects, ReferencedToRecord),
        InferenceRule::list(LoadBalancer, "target_instance_ids", RoutesTo, RecordToReferenced),
        InferenceRule::single(DatabaseInstance, "vpc_id", Contains, ReferencedToRecord),
        InferenceRule::list(DatabaseInstance, "subnet_ids", Hosts, ReferencedToRecord),
        InferenceRule::list(DatabaseInstance, "security_group_ids", Protects, ReferencedToRecord),
        InferenceRule::single(ServerlessEni, "vpc_id", Contains, ReferencedToRecord),
        InferenceRule::single(ServerlessEni, "subnet_id", Hosts, ReferencedToRecord),
        InferenceRule::list(ServerlessEni, "security_group_ids", Protects, ReferencedToRecord),
    ]
}

/// Build the topology graph from collected records. Duplicate ids keep the
/// first record seen; references to resources that were never collected
/// become diagnostics, never edges to phantom nodes.
pub fn build_graph(records: Vec<ResourceRecord>) -> (TopologyGraph, Vec<Diagnostic>) {
    let mut graph = TopologyGraph::new();
    let mut diagnostics = Vec::new();

    for record in records {
        let id = record.id.clone();
        if !graph.insert_node(record) {
            diagnostics.push(Diagnostic::new(
                "graph_builder",
                format!("duplicate resource id {}, keeping first occurrence", id),
            ));
        }
    }

    for rule in inference_rules() {
        // Node iteration is id-sorted, so edge generation order is stable.
        let mut pending: Vec<Relationship> = Vec::new();
        for node in graph.nodes_of_type(&rule.source_type) {
            let referenced: Vec<String> = if rule.list {
                node.attr_str_list(rule.attribute)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            } else {
                node.attr_str(rule.attribute)
                    .map(str::to_string)
                    .into_iter()
                    .collect()
            };
            for target in referenced {
                if !graph.contains_node(&target) {
                    diagnostics.push(Diagnostic::new(
                        "graph_builder",
                        format!(
                            "{} {} references {} via {}, which was not collected",
                            node.resource_type, node.id, target, rule.attribute
                        ),
                    ));
                    continue;
                }
                let edge = match rule.direction {
                    EdgeDirection::ReferencedToRecord => {
                        Relationship::new(&target, &node.id, rule.kind.clone())
                    }
                    EdgeDirection::RecordToReferenced => {
                        Relationship::new(&node.id, &target, rule.kind.clone())
                    }
                };
                pending.push(edge);
            }
        }
        for edge in pending {
            // Both endpoints were checked above.
            if let Err(e) = graph.add_edge(edge) {
                debug!(error = %e, "skipping edge with vanished endpoint");
            }
        }
    }

    graph.finalize();
    (graph, diagnostics)
}
