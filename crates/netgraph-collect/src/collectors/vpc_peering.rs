use super::{collect_with, get_nested_str, get_str, name_from_tags, tags_map, CollectorContext};
use async_trait::async_trait;
use netgraph_core::{CollectionOutcome, Collector, ResourceRecord, ResourceType};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct VpcPeeringCollector {
    ctx: Arc<CollectorContext>,
}

impl VpcPeeringCollector {
    pub fn new(ctx: Arc<CollectorContext>) -> Self {
        Self { ctx }
    }

    fn normalize(item: &Value, region: &str) -> Option<ResourceRecord> {
        let id = get_str(item, "VpcPeeringConnectionId")?;
        let mut record = ResourceRecord::new(id, ResourceType::VpcPeering, region)
            .with_name(name_from_tags(item))
            .with_attr("tags", Value::Object(tags_map(item)))
            .with_attr("raw", item.clone());
        if let Some(requester) = get_nested_str(item, "RequesterVpcInfo", "VpcId") {
            record = record.with_attr("requester_vpc_id", json!(requester));
        }
        if let Some(accepter) = get_nested_str(item, "AccepterVpcInfo", "VpcId") {
            record = record.with_attr("accepter_vpc_id", json!(accepter));
        }
        if let Some(status) = get_nested_str(item, "Status", "Code") {
            record = record.with_attr("status", json!(status));
        }
        Some(record)
    }
}

#[async_trait]
impl Collector for VpcPeeringCollector {
    fn resource_type(&self) -> ResourceType {
        ResourceType::VpcPeering
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
    fn extracts_both_vpc_sides() {
        let item = json!({
            "VpcPeeringConnectionId": "pcx-1",
            "RequesterVpcInfo": {"VpcId": "vpc-1"},
            "AccepterVpcInfo": {"VpcId": "vpc-2"},
            "Status": {"Code": "active"}
        });
        let record = VpcPeeringCollector::normalize(&item, "us-east-1").unwrap();
        assert_eq!(record.attr_str("requester_vpc_id").as_deref(), Some("vpc-1"));
        assert_eq!(record.attr_str("accepter_vpc_id").as_deref(), Some("vpc-2"));
        assert_eq!(record.attr_str("status").as_deref(), Some("active"));
    }
}
