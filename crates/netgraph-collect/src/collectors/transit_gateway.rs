use super::{collect_ids, collect_with, get_str, name_from_tags, tags_map, CollectorContext};
use async_trait::async_trait;
use netgraph_core::{CollectionOutcome, Collector, ResourceRecord, ResourceType};
use serde_json::{json, Value};
use std::sync::Arc;

/// Collects transit gateways, the regional hubs that stitch VPCs together.
pub struct TransitGatewayCollector {
    ctx: Arc<CollectorContext>,
}

impl TransitGatewayCollector {
    pub fn new(ctx: Arc<CollectorContext>) -> Self {
        Self { ctx }
    }

    fn normalize(item: &Value, region: &str) -> Option<ResourceRecord> {
        let id = get_str(item, "TransitGatewayId")?;
        let mut record = ResourceRecord::new(id, ResourceType::TransitGateway, region)
            .with_name(name_from_tags(item))
            .with_attr(
                "attached_vpc_ids",
                Value::Array(collect_ids(item, "VpcAttachments", "VpcId")),
            )
            .with_attr("tags", Value::Object(tags_map(item)))
            .with_attr("raw", item.clone());
        if let Some(state) = get_str(item, "State") {
            record = record.with_attr("state", json!(state));
        }
        if let Some(owner) = get_str(item, "OwnerId") {
            record = record.with_attr("owner_id", json!(owner));
        }
        if let Some(description) = get_str(item, "Description") {
            record = record.with_attr("description", json!(description));
        }
        Some(record)
    }
}

#[async_trait]
impl Collector for TransitGatewayCollector {
    fn resource_type(&self) -> ResourceType {
        ResourceType::TransitGateway
    }

    fn service(&self) -> &'static str {
        "network"
    }

    async fn collect(&self, region: &str) -> CollectionOutcome {
        collect_with(&self.ctx, self.service(), self.resource_type(), region, Self::normalize).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_vpc_attachments() {
        let item = json!({
            "TransitGatewayId": "tgw-1",
            "State": "available",
            "VpcAttachments": [{"VpcId": "vpc-1"}, {"VpcId": "vpc-2"}]
        });
        let record = TransitGatewayCollector::normalize(&item, "us-east-1").unwrap();
        assert_eq!(record.attr_str_list("attached_vpc_ids"), vec!["vpc-1", "vpc-2"]);
    }
}
