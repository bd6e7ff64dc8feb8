use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resource kinds discovered by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Vpc,
    Subnet,
    ComputeInstance,
    InternetGateway,
    NatGateway,
    TransitGateway,
    SecurityGroup,
    RouteTable,
    NetworkAcl,
    VpcPeering,
    VpnConnection,
    DedicatedLink,
    LoadBalancer,
    DatabaseInstance,
    ServerlessEni,
    Other(String),
}

impl ResourceType {
    /// All concrete resource kinds with a registered collector.
    pub fn all() -> Vec<ResourceType> {
        vec![
            ResourceType::Vpc,
            ResourceType::Subnet,
            ResourceType::ComputeInstance,
            ResourceType::InternetGateway,
            ResourceType::NatGateway,
            ResourceType::TransitGateway,
            ResourceType::SecurityGroup,
            ResourceType::RouteTable,
            ResourceType::NetworkAcl,
            ResourceType::VpcPeering,
            ResourceType::VpnConnection,
            ResourceType::DedicatedLink,
            ResourceType::LoadBalancer,
            ResourceType::DatabaseInstance,
            ResourceType::ServerlessEni,
        ]
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceType::Vpc => "vpc",
            ResourceType::Subnet => "subnet",
            ResourceType::ComputeInstance => "compute_instance",
            ResourceType::InternetGateway => "internet_gateway",
            ResourceType::NatGateway => "nat_gateway",
            ResourceType::TransitGateway => "transit_gateway",
            ResourceType::SecurityGroup => "security_group",
            ResourceType::RouteTable => "route_table",
            ResourceType::NetworkAcl => "network_acl",
            ResourceType::VpcPeering => "vpc_peering",
            ResourceType::VpnConnection => "vpn_connection",
            ResourceType::DedicatedLink => "dedicated_link",
            ResourceType::LoadBalancer => "load_balancer",
            ResourceType::DatabaseInstance => "database_instance",
            ResourceType::ServerlessEni => "serverless_eni",
            ResourceType::Other(s) => s.as_str(),
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vpc" => Ok(ResourceType::Vpc),
            "subnet" => Ok(ResourceType::Subnet),
            "compute_instance" => Ok(ResourceType::ComputeInstance),
            "internet_gateway" => Ok(ResourceType::InternetGateway),
            "nat_gateway" => Ok(ResourceType::NatGateway),
            "transit_gateway" => Ok(ResourceType::TransitGateway),
            "security_group" => Ok(ResourceType::SecurityGroup),
            "route_table" => Ok(ResourceType::RouteTable),
            "network_acl" => Ok(ResourceType::NetworkAcl),
            "vpc_peering" => Ok(ResourceType::VpcPeering),
            "vpn_connection" => Ok(ResourceType::VpnConnection),
            "dedicated_link" => Ok(ResourceType::DedicatedLink),
            "load_balancer" => Ok(ResourceType::LoadBalancer),
            "database_instance" => Ok(ResourceType::DatabaseInstance),
            "serverless_eni" => Ok(ResourceType::ServerlessEni),
            other => Ok(ResourceType::Other(other.to_string())),
        }
    }
}

/// Directed relationship kinds inferred between resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Contains,
    Hosts,
    ConnectsTo,
    RoutesTo,
    AttachedTo,
    Protects,
    PeersWith,
    DependsOn,
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelationshipType::Contains => "contains",
            RelationshipType::Hosts => "hosts",
            RelationshipType::ConnectsTo => "connects_to",
            RelationshipType::RoutesTo => "routes_to",
            RelationshipType::AttachedTo => "attached_to",
            RelationshipType::Protects => "protects",
            RelationshipType::PeersWith => "peers_with",
            RelationshipType::DependsOn => "depends_on",
        };
        write!(f, "{}", s)
    }
}

/// Severity levels for anomalies and posture findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            "info" => Ok(Severity::Info),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

/// Anomaly categories produced by the detector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    SecurityGroupMisconfiguration,
    NetworkSegmentationViolation,
    RoutingAnomaly,
    ComplianceViolation,
    CostOptimization,
    OrphanedResource,
    MissingEncryption,
    MissingLogging,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnomalyKind::SecurityGroupMisconfiguration => "security_group_misconfiguration",
            AnomalyKind::NetworkSegmentationViolation => "network_segmentation_violation",
            AnomalyKind::RoutingAnomaly => "routing_anomaly",
            AnomalyKind::ComplianceViolation => "compliance_violation",
            AnomalyKind::CostOptimization => "cost_optimization",
            AnomalyKind::OrphanedResource => "orphaned_resource",
            AnomalyKind::MissingEncryption => "missing_encryption",
            AnomalyKind::MissingLogging => "missing_logging",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for AnomalyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "security_group_misconfiguration" => Ok(AnomalyKind::SecurityGroupMisconfiguration),
            "network_segmentation_violation" => Ok(AnomalyKind::NetworkSegmentationViolation),
            "routing_anomaly" => Ok(AnomalyKind::RoutingAnomaly),
            "compliance_violation" => Ok(AnomalyKind::ComplianceViolation),
            "cost_optimization" => Ok(AnomalyKind::CostOptimization),
            "orphaned_resource" => Ok(AnomalyKind::OrphanedResource),
            "missing_encryption" => Ok(AnomalyKind::MissingEncryption),
            "missing_logging" => Ok(AnomalyKind::MissingLogging),
            other => Err(format!("unknown anomaly kind: {}", other)),
        }
    }
}

/// Provenance of an anomaly finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSource {
    Rule,
    Model,
}

impl fmt::Display for FindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingSource::Rule => write!(f, "rule"),
            FindingSource::Model => write!(f, "model"),
        }
    }
}

/// Non-fatal data-quality note attached to a run's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub component: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            message: message.into(),
        }
    }
}
