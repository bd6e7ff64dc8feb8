use crate::DigestBuilder;
use netgraph_core::{
    Anomaly, AnomalyKind, AnomalyReport, Diagnostic, ModelFinding, ModelProvider, Severity,
};
use netgraph_graph::{GraphAnalyzer, PostureIssue, TopologyGraph};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// How far the detection run got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPhase {
    /// Model analysis was not requested.
    RulesOnly,
    /// Model analysis was requested but failed; only rule findings remain.
    Degraded,
    /// Rule and model findings were merged.
    Merged,
}

#[derive(Debug)]
pub struct DetectionRun {
    pub report: AnomalyReport,
    pub phase: DetectionPhase,
    pub diagnostics: Vec<Diagnostic>,
}

/// Two-pass anomaly detection: deterministic rules over the graph, then an
/// optional model pass whose findings are validated and merged in. The rule
/// pass can never be weakened by the model pass; on identical findings the
/// rule instance wins.
pub struct AnomalyDetector {
    model: Option<Arc<dyn ModelProvider>>,
    digest_builder: DigestBuilder,
}

impl AnomalyDetector {
    pub fn new(model: Option<Arc<dyn ModelProvider>>, max_digest_chars: usize) -> Self {
        Self {
            model,
            digest_builder: DigestBuilder::new(max_digest_chars),
        }
    }

    pub async fn detect(&self, graph: &TopologyGraph) -> DetectionRun {
        let analyzer = GraphAnalyzer::new(graph);
        let mut diagnostics = Vec::new();

        let mut merged: BTreeMap<(String, Vec<String>), Anomaly> = BTreeMap::new();
        for anomaly in rule_findings(graph, &analyzer) {
            merged.insert(anomaly.dedup_key(), anomaly);
        }
        let rule_count = merged.len();

        let phase = match &self.model {
            None => DetectionPhase::RulesOnly,
            Some(model) => {
                let digest = self.digest_builder.build(graph, &analyzer.summarize(10));
                match model.analyze_topology(digest.value()).await {
                    Ok(findings) => {
                        let mut accepted = 0usize;
                        for finding in findings {
                            match convert_model_finding(finding, graph) {
                                Ok(anomaly) => {
                                    let key = anomaly.dedup_key();
                                    // Strictly greater confidence replaces;
                                    // ties keep the earlier (rule) finding.
                                    let keep = merged
                                        .get(&key)
                                        .is_none_or(|existing| anomaly.confidence > existing.confidence);
                                    if keep {
                                        merged.insert(key, anomaly);
                                        accepted += 1;
                                    }
                                }
                                Err(reason) => {
                                    diagnostics.push(Diagnostic::new("anomaly_detector", reason));
                                }
                            }
                        }
                        info!(accepted, "model findings merged");
                        DetectionPhase::Merged
                    }
                    Err(e) => {
                        warn!(error = %e, "model analysis failed, continuing with rule findings");
                        diagnostics.push(Diagnostic::new(
                            "anomaly_detector",
                            format!("model analysis unavailable: {}", e),
                        ));
                        DetectionPhase::Degraded
                    }
                }
            }
        };

        let report = AnomalyReport::from_anomalies(merged.into_values().collect());
        info!(
            total = report.total,
            from_rules = rule_count,
            phase = ?phase,
            "detection finished"
        );
        DetectionRun {
            report,
            phase,
            diagnostics,
        }
    }
}

/// Validate one model finding against the graph and the known vocabularies.
fn convert_model_finding(
    finding: ModelFinding,
    graph: &TopologyGraph,
) -> std::result::Result<Anomaly, String> {
    let kind = AnomalyKind::from_str(&finding.kind)
        .map_err(|e| format!("model finding '{}': {}", finding.title, e))?;
    let severity = Severity::from_str(&finding.severity)
        .map_err(|e| format!("model finding '{}': {}", finding.title, e))?;
    let affected: Vec<String> = finding
        .affected_resources
        .into_iter()
        .filter(|id| graph.contains_node(id))
        .collect();
    if affected.is_empty() {
        return Err(format!(
            "model finding '{}' references no known resources",
            finding.title
        ));
    }
    let mut anomaly = Anomaly::model(
        kind,
        severity,
        finding.title,
        finding.description,
        affected,
        finding.confidence,
    );
    if let Some(remediation) = finding.remediation {
        anomaly = anomaly.with_remediation(remediation);
    }
    Ok(anomaly)
}

/// The deterministic rule pass: posture checks plus orphan detection.
fn rule_findings(graph: &TopologyGraph, analyzer: &GraphAnalyzer<'_>) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    for issue in netgraph_graph::evaluate_posture(graph) {
        anomalies.push(match issue {
            PostureIssue::UnrestrictedIngress {
                group_id,
                protocol,
                port_range,
                cidr,
            } => Anomaly::rule(
                AnomalyKind::SecurityGroupMisconfiguration,
                Severity::High,
                format!("Security group {} open to the internet", group_id),
                format!(
                    "Ingress rule allows {} on port {} from {}",
                    protocol, port_range, cidr
                ),
                vec![group_id],
            )
            .with_remediation("Restrict the ingress rule to known CIDR ranges"),
            PostureIssue::UnprotectedCompute { instance_id } => Anomaly::rule(
                AnomalyKind::SecurityGroupMisconfiguration,
                Severity::Medium,
                format!("Instance {} has no security group", instance_id),
                "No Protects relationship reaches this instance; traffic filtering is undefined",
                vec![instance_id],
            )
            .with_remediation("Attach at least one security group to the instance"),
            PostureIssue::ExposedDatabase {
                database_id,
                vpc_id,
            } => Anomaly::rule(
                AnomalyKind::NetworkSegmentationViolation,
                Severity::High,
                format!("Database {} is reachable from the internet", database_id),
                format!(
                    "Publicly accessible database inside {} which has an internet gateway attached",
                    vpc_id
                ),
                vec![database_id, vpc_id],
            )
            .with_remediation("Disable public accessibility or move the database to a private VPC"),
            PostureIssue::VpcWithoutSubnets { vpc_id } => Anomaly::rule(
                AnomalyKind::NetworkSegmentationViolation,
                Severity::Medium,
                format!("VPC {} contains no subnets", vpc_id),
                "An empty VPC usually indicates abandoned or incomplete provisioning",
                vec![vpc_id],
            ),
            PostureIssue::NoInternetEgress {
                vpc_id,
                instance_count,
            } => Anomaly::rule(
                AnomalyKind::RoutingAnomaly,
                Severity::Low,
                format!("VPC {} has no internet egress", vpc_id),
                format!(
                    "{} instance(s) run in a VPC with no internet gateway attached",
                    instance_count
                ),
                vec![vpc_id],
            ),
        });
    }

    for node_id in analyzer.isolated_nodes() {
        anomalies.push(
            Anomaly::rule(
                AnomalyKind::OrphanedResource,
                Severity::Medium,
                format!("Resource {} has no relationships", node_id),
                "The resource is not connected to anything else discovered in this run",
                vec![node_id],
            )
            .with_remediation("Verify the resource is still needed and delete it if not"),
        );
    }

    anomalies
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use netgraph_core::{FindingSource, ModelResult, Relationship, RelationshipType, ResourceRecord, ResourceType};
    use serde_json::{json, Value};

    fn graph_with_open_group() -> TopologyGraph {
        let mut graph = TopologyGraph::new();
        graph.insert_node(
            ResourceRecord::new("sg-1", ResourceType::SecurityGroup, "us-east-1").with_attr(
                "ingress_rules",
                json!([{"ip_protocol": "tcp", "from_port": 22, "to_port": 22,
                        "ip_ranges": [{"cidr": "0.0.0.0/0"}]}]),
            ),
        );
        graph.insert_node(ResourceRecord::new("i-1", ResourceType::ComputeInstance, "us-east-1"));
        graph
            .add_edge(Relationship::new("sg-1", "i-1", RelationshipType::Protects))
            .unwrap();
        graph.finalize();
        graph
    }

    struct FixedModel {
        findings: Vec<ModelFinding>,
        fail: bool,
    }

    #[async_trait]
    impl ModelProvider for FixedModel {
        async fn analyze_topology(&self, _digest: &Value) -> ModelResult<Vec<ModelFinding>> {
            if self.fail {
                anyhow::bail!("endpoint unreachable");
            }
            Ok(self.findings.clone())
        }
    }

    fn finding(kind: &str, severity: &str, affected: &[&str], confidence: f64) -> ModelFinding {
        ModelFinding {
            kind: kind.into(),
            severity: severity.into(),
            title: format!("{} on {:?}", kind, affected),
            description: String::new(),
            affected_resources: affected.iter().map(|s| s.to_string()).collect(),
            confidence,
            remediation: None,
        }
    }

    #[tokio::test]
    async fn rules_only_without_model() {
        let detector = AnomalyDetector::new(None, 16_000);
        let run = detector.detect(&graph_with_open_group()).await;
        assert_eq!(run.phase, DetectionPhase::RulesOnly);
        assert_eq!(run.report.total, 1);
        assert_eq!(run.report.anomalies[0].kind, AnomalyKind::SecurityGroupMisconfiguration);
        assert_eq!(run.report.anomalies[0].confidence, 1.0);
    }

    #[tokio::test]
    async fn model_failure_degrades_to_rules() {
        let model = Arc::new(FixedModel {
            findings: vec![],
            fail: true,
        });
        let detector = AnomalyDetector::new(Some(model), 16_000);
        let run = detector.detect(&graph_with_open_group()).await;
        assert_eq!(run.phase, DetectionPhase::Degraded);
        assert_eq!(run.report.total, 1);
        assert_eq!(run.diagnostics.len(), 1);
        assert!(run.diagnostics[0].message.contains("unavailable"));
    }

    #[tokio::test]
    async fn duplicate_model_finding_never_displaces_rule() {
        // Same kind and affected set as the rule finding, lower confidence.
        let model = Arc::new(FixedModel {
            findings: vec![finding(
                "security_group_misconfiguration",
                "critical",
                &["sg-1"],
                0.7,
            )],
            fail: false,
        });
        let detector = AnomalyDetector::new(Some(model), 16_000);
        let run = detector.detect(&graph_with_open_group()).await;
        assert_eq!(run.phase, DetectionPhase::Merged);
        assert_eq!(run.report.total, 1);
        let kept = &run.report.anomalies[0];
        assert_eq!(kept.source, FindingSource::Rule);
        assert_eq!(kept.confidence, 1.0);
    }

    #[tokio::test]
    async fn novel_model_finding_is_added() {
        let model = Arc::new(FixedModel {
            findings: vec![finding("cost_optimization", "info", &["i-1"], 0.55)],
            fail: false,
        });
        let detector = AnomalyDetector::new(Some(model), 16_000);
        let run = detector.detect(&graph_with_open_group()).await;
        assert_eq!(run.report.total, 2);
        let cost = run
            .report
            .anomalies
            .iter()
            .find(|a| a.kind == AnomalyKind::CostOptimization)
            .unwrap();
        assert_eq!(cost.source, FindingSource::Model);
        assert_eq!(cost.confidence, 0.55);
    }

    #[tokio::test]
    async fn invalid_model_findings_become_diagnostics() {
        let model = Arc::new(FixedModel {
            findings: vec![
                finding("not_a_kind", "high", &["sg-1"], 0.9),
                finding("routing_anomaly", "high", &["ghost-resource"], 0.9),
            ],
            fail: false,
        });
        let detector = AnomalyDetector::new(Some(model), 16_000);
        let run = detector.detect(&graph_with_open_group()).await;
        assert_eq!(run.phase, DetectionPhase::Merged);
        assert_eq!(run.report.total, 1);
        assert_eq!(run.diagnostics.len(), 2);
    }

    #[tokio::test]
    async fn isolated_node_is_reported_as_orphan() {
        let mut graph = TopologyGraph::new();
        graph.insert_node(ResourceRecord::new("dxcon-1", ResourceType::DedicatedLink, "us-east-1"));
        graph.finalize();
        let run = AnomalyDetector::new(None, 16_000).detect(&graph).await;
        assert_eq!(run.report.total, 1);
        assert_eq!(run.report.anomalies[0].kind, AnomalyKind::OrphanedResource);
        assert_eq!(run.report.anomalies[0].severity, Severity::Medium);
    }
}
