use crate::TopologyGraph;
use netgraph_core::{RelationshipType, ResourceType};
use serde::Serialize;
use serde_json::Value;

const OPEN_CIDRS: [&str; 2] = ["0.0.0.0/0", "::/0"];

/// A structural weakness found by scanning the graph. These are facts about
/// the topology; the detector decides how severe each one is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum PostureIssue {
    /// A security group ingress rule open to the whole internet.
    UnrestrictedIngress {
        group_id: String,
        protocol: String,
        port_range: String,
        cidr: String,
    },
    /// A compute instance with no security group protecting it.
    UnprotectedCompute { instance_id: String },
    /// A publicly accessible database inside an internet-facing VPC.
    ExposedDatabase { database_id: String, vpc_id: String },
    /// A VPC that contains no subnets.
    VpcWithoutSubnets { vpc_id: String },
    /// A VPC hosting instances with no internet gateway attached.
    NoInternetEgress { vpc_id: String, instance_count: usize },
}

fn rule_port_range(rule: &Value) -> String {
    match (rule.get("from_port").and_then(Value::as_i64), rule.get("to_port").and_then(Value::as_i64)) {
        (Some(from), Some(to)) if from == to => from.to_string(),
        (Some(from), Some(to)) => format!("{}-{}", from, to),
        _ => "all".to_string(),
    }
}

fn unrestricted_ingress(graph: &TopologyGraph, issues: &mut Vec<PostureIssue>) {
    for group in graph.nodes_of_type(&ResourceType::SecurityGroup) {
        let Some(rules) = group.attributes.get("ingress_rules").and_then(Value::as_array) else {
            continue;
        };
        for rule in rules {
            let Some(ranges) = rule.get("ip_ranges").and_then(Value::as_array) else {
                continue;
            };
            for range in ranges {
                let Some(cidr) = range.get("cidr").and_then(Value::as_str) else {
                    continue;
                };
                if OPEN_CIDRS.contains(&cidr) {
                    issues.push(PostureIssue::UnrestrictedIngress {
                        group_id: group.id.clone(),
                        protocol: rule
                            .get("ip_protocol")
                            .and_then(Value::as_str)
                            .unwrap_or("-1")
                            .to_string(),
                        port_range: rule_port_range(rule),
                        cidr: cidr.to_string(),
                    });
                }
            }
        }
    }
}

fn unprotected_compute(graph: &TopologyGraph, issues: &mut Vec<PostureIssue>) {
    for instance in graph.nodes_of_type(&ResourceType::ComputeInstance) {
        if !graph.has_incoming(&instance.id, &RelationshipType::Protects) {
            issues.push(PostureIssue::UnprotectedCompute {
                instance_id: instance.id.clone(),
            });
        }
    }
}

fn vpc_has_internet_gateway(graph: &TopologyGraph, vpc_id: &str) -> bool {
    graph.in_edges(vpc_id).any(|e| {
        e.kind == RelationshipType::AttachedTo
            && graph
                .node(&e.source_id)
                .is_some_and(|n| n.resource_type == ResourceType::InternetGateway)
    })
}

fn exposed_databases(graph: &TopologyGraph, issues: &mut Vec<PostureIssue>) {
    for db in graph.nodes_of_type(&ResourceType::DatabaseInstance) {
        if db.attr_bool("publicly_accessible") != Some(true) {
            continue;
        }
        let Some(vpc_id) = db.attr_str("vpc_id") else {
            continue;
        };
        if vpc_has_internet_gateway(graph, vpc_id) {
            issues.push(PostureIssue::ExposedDatabase {
                database_id: db.id.clone(),
                vpc_id: vpc_id.to_string(),
            });
        }
    }
}

fn vpc_shape(graph: &TopologyGraph, issues: &mut Vec<PostureIssue>) {
    for vpc in graph.nodes_of_type(&ResourceType::Vpc) {
        let has_subnets = graph.out_edges(&vpc.id).any(|e| {
            e.kind == RelationshipType::Contains
                && graph
                    .node(&e.target_id)
                    .is_some_and(|n| n.resource_type == ResourceType::Subnet)
        });
        if !has_subnets {
            issues.push(PostureIssue::VpcWithoutSubnets {
                vpc_id: vpc.id.clone(),
            });
            continue;
        }
        let instance_count = graph
            .nodes_of_type(&ResourceType::ComputeInstance)
            .filter(|i| i.attr_str("vpc_id").as_deref() == Some(vpc.id.as_str()))
            .count();
        if instance_count > 0 && !vpc_has_internet_gateway(graph, &vpc.id) {
            issues.push(PostureIssue::NoInternetEgress {
                vpc_id: vpc.id.clone(),
                instance_count,
            });
        }
    }
}

/// Run every posture check over the graph. Output order is fixed: checks
/// run in a set sequence and each one walks nodes in id order, so the same
/// graph always produces the same issue list.
pub fn evaluate_posture(graph: &TopologyGraph) -> Vec<PostureIssue> {
    let mut issues = Vec::new();
    unrestricted_ingress(graph, &mut issues);
    unprotected_compute(graph, &mut issues);
    exposed_databases(graph, &mut issues);
    vpc_shape(graph, &mut issues);
    issues
}
