use crate::{AnomalyKind, FindingSource, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single detected finding, immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub affected_resources: Vec<String>,
    pub confidence: f64,
    pub source: FindingSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl Anomaly {
    /// Deterministic rule finding; confidence is pinned to 1.0.
    pub fn rule(
        kind: AnomalyKind,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
        affected_resources: Vec<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            title: title.into(),
            description: description.into(),
            affected_resources,
            confidence: 1.0,
            source: FindingSource::Rule,
            remediation: None,
        }
    }

    /// Model-assisted finding; confidence is clamped to [0, 1].
    pub fn model(
        kind: AnomalyKind,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
        affected_resources: Vec<String>,
        confidence: f64,
    ) -> Self {
        Self {
            kind,
            severity,
            title: title.into(),
            description: description.into(),
            affected_resources,
            confidence: confidence.clamp(0.0, 1.0),
            source: FindingSource::Model,
            remediation: None,
        }
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    /// Merge identity: findings with the same kind and affected set are
    /// duplicates; the higher-confidence instance wins.
    pub fn dedup_key(&self) -> (String, Vec<String>) {
        let mut ids = self.affected_resources.clone();
        ids.sort();
        (self.kind.to_string(), ids)
    }
}

/// Final detection artifact: ordered findings plus totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub total: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_kind: BTreeMap<String, usize>,
    pub anomalies: Vec<Anomaly>,
}

impl AnomalyReport {
    pub fn from_anomalies(mut anomalies: Vec<Anomaly>) -> Self {
        anomalies.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| a.affected_resources.cmp(&b.affected_resources))
        });

        let mut by_severity: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_kind: BTreeMap<String, usize> = BTreeMap::new();
        for anomaly in &anomalies {
            *by_severity.entry(anomaly.severity.to_string()).or_insert(0) += 1;
            *by_kind.entry(anomaly.kind.to_string()).or_insert(0) += 1;
        }

        Self {
            total: anomalies.len(),
            by_severity,
            by_kind,
            anomalies,
        }
    }
}
