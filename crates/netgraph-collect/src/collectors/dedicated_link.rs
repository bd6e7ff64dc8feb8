use super::{collect_with, get_str, CollectorContext};
use async_trait::async_trait;
use netgraph_core::{CollectionOutcome, Collector, ResourceRecord, ResourceType};
use serde_json::{json, Value};
use std::sync::Arc;

/// Collects dedicated physical links into the provider network. Links often
/// have no resolvable reference to other collected resources, so they are a
/// common legitimate source of orphan findings.
pub struct DedicatedLinkCollector {
    ctx: Arc<CollectorContext>,
}

impl DedicatedLinkCollector {
    pub fn new(ctx: Arc<CollectorContext>) -> Self {
        Self { ctx }
    }

    fn normalize(item: &Value, region: &str) -> Option<ResourceRecord> {
        let id = get_str(item, "ConnectionId")?;
        let mut record = ResourceRecord::new(id, ResourceType::DedicatedLink, region)
            .with_name(get_str(item, "ConnectionName").unwrap_or_default())
            .with_attr("raw", item.clone());
        if let Some(state) = get_str(item, "ConnectionState") {
            record = record.with_attr("state", json!(state));
        }
        if let Some(location) = get_str(item, "Location") {
            record = record.with_attr("location", json!(location));
        }
        if let Some(bandwidth) = get_str(item, "Bandwidth") {
            record = record.with_attr("bandwidth", json!(bandwidth));
        }
        if let Some(partner) = get_str(item, "PartnerName") {
            record = record.with_attr("partner_name", json!(partner));
        }
        Some(record)
    }
}

#[async_trait]
impl Collector for DedicatedLinkCollector {
    fn resource_type(&self) -> ResourceType {
        ResourceType::DedicatedLink
    }

    fn service(&self) -> &'static str {
        "interconnect"
    }

    async fn collect(&self, region: &str) -> CollectionOutcome {
        collect_with(&self.ctx, self.service(), self.resource_type(), region, Self::normalize).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_link_metadata() {
        let item = json!({
            "ConnectionId": "dxcon-1",
            "ConnectionName": "dc-uplink",
            "ConnectionState": "available",
            "Bandwidth": "10Gbps"
        });
        let record = DedicatedLinkCollector::normalize(&item, "us-east-1").unwrap();
        assert_eq!(record.name.as_deref(), Some("dc-uplink"));
        assert_eq!(record.attr_str("bandwidth").as_deref(), Some("10Gbps"));
    }
}
