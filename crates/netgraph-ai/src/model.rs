use anyhow::{anyhow, Context};
use async_trait::async_trait;
use netgraph_core::{ModelConfig, ModelFinding, ModelProvider, ModelResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are a cloud network topology analyst. You receive a JSON digest \
of a resource graph: nodes, typed edges, and a structural summary. Identify anomalies: security \
misconfigurations, segmentation violations, routing problems, orphaned resources, and cost \
waste. Respond with a JSON object {\"findings\": [...]} where each finding has kind, severity \
(critical|high|medium|low|info), title, description, affected_resources (ids from the digest), \
confidence (0.0-1.0), and optional remediation. Report only what the digest supports.";

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ModelResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct FindingsEnvelope {
    findings: Vec<Value>,
}

/// HTTP client for the model analysis endpoint. One request per run; all
/// failures bubble up to the detector, which degrades to rule findings.
pub struct HttpModelClient {
    config: ModelConfig,
    client: Client,
}

impl HttpModelClient {
    pub fn new(config: ModelConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building model HTTP client")?;
        Ok(Self { config, client })
    }

    /// Pull candidate findings out of the model's text reply. Accepts a
    /// fenced ```json block, a bare JSON object with a findings array, or a
    /// bare array. Individual malformed findings are skipped, not fatal.
    pub fn parse_findings(text: &str) -> ModelResult<Vec<ModelFinding>> {
        let payload = extract_json(text)
            .ok_or_else(|| anyhow!("model reply contains no JSON payload"))?;
        let candidates: Vec<Value> = match payload {
            Value::Array(items) => items,
            object @ Value::Object(_) => {
                serde_json::from_value::<FindingsEnvelope>(object)
                    .context("findings envelope has unexpected shape")?
                    .findings
            }
            other => return Err(anyhow!("unexpected JSON payload: {}", other)),
        };

        let mut findings = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match serde_json::from_value::<ModelFinding>(candidate.clone()) {
                Ok(finding) => findings.push(finding),
                Err(e) => warn!(error = %e, "dropping malformed model finding"),
            }
        }
        Ok(findings)
    }
}

/// Locate the JSON payload inside free-form model text. Outside a fenced
/// block, the bracket that opens first decides whether the payload is read
/// as an object or an array, so a bare array is never mistaken for its
/// first element.
fn extract_json(text: &str) -> Option<Value> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        if let Some(end) = rest.find("```") {
            if let Ok(value) = serde_json::from_str(rest[..end].trim()) {
                return Some(value);
            }
        }
    }
    let open = match (text.find('{'), text.find('[')) {
        (Some(obj), Some(arr)) if arr < obj => '[',
        (Some(_), _) => '{',
        (None, Some(_)) => '[',
        (None, None) => return None,
    };
    let close = if open == '{' { '}' } else { ']' };
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if start < end {
        if let Ok(value) = serde_json::from_str(text[start..=end].trim()) {
            return Some(value);
        }
    }
    None
}

#[async_trait]
impl ModelProvider for HttpModelClient {
    async fn analyze_topology(&self, digest: &Value) -> ModelResult<Vec<ModelFinding>> {
        let body = json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "system": SYSTEM_PROMPT,
            "messages": [{
                "role": "user",
                "content": format!("Analyze this network topology digest:\n{}", digest),
            }],
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("x-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("model request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("model endpoint returned {}: {}", status, body));
        }

        let reply: ModelResponse = response
            .json()
            .await
            .context("model reply is not valid JSON")?;
        let text: String = reply
            .content
            .iter()
            .map(|block| block.text.as_str())
            .collect();
        debug!(chars = text.len(), "model reply received");
        Self::parse_findings(&text)
    }
}
