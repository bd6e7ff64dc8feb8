use super::{collect_with, get_bool, get_str, name_from_tags, tags_map, CollectorContext};
use async_trait::async_trait;
use netgraph_core::{CollectionOutcome, Collector, ResourceRecord, ResourceType};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct SubnetCollector {
    ctx: Arc<CollectorContext>,
}

impl SubnetCollector {
    pub fn new(ctx: Arc<CollectorContext>) -> Self {
        Self { ctx }
    }

    fn normalize(item: &Value, region: &str) -> Option<ResourceRecord> {
        let id = get_str(item, "SubnetId")?;
        let mut record = ResourceRecord::new(id, ResourceType::Subnet, region)
            .with_name(name_from_tags(item))
            .with_attr("tags", Value::Object(tags_map(item)))
            .with_attr("raw", item.clone());
        if let Some(vpc_id) = get_str(item, "VpcId") {
            record = record.with_attr("vpc_id", json!(vpc_id));
        }
        if let Some(cidr) = get_str(item, "CidrBlock") {
            record = record.with_attr("cidr_block", json!(cidr));
        }
        if let Some(az) = get_str(item, "AvailabilityZone") {
            record = record.with_attr("availability_zone", json!(az));
        }
        if let Some(state) = get_str(item, "State") {
            record = record.with_attr("state", json!(state));
        }
        if let Some(count) = item.get("AvailableIpAddressCount").and_then(Value::as_u64) {
            record = record.with_attr("available_ip_address_count", json!(count));
        }
        if let Some(public) = get_bool(item, "MapPublicIpOnLaunch") {
            record = record.with_attr("map_public_ip_on_launch", json!(public));
        }
        Some(record)
    }
}

#[async_trait]
impl Collector for SubnetCollector {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Subnet
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
    fn normalizes_vpc_reference() {
        let item = json!({
            "SubnetId": "subnet-1",
            "VpcId": "vpc-1",
            "CidrBlock": "10.0.1.0/24",
            "AvailabilityZone": "us-east-1a",
            "MapPublicIpOnLaunch": true
        });
        let record = SubnetCollector::normalize(&item, "us-east-1").unwrap();
        assert_eq!(record.attr_str("vpc_id").as_deref(), Some("vpc-1"));
        assert_eq!(record.attr_bool("map_public_ip_on_launch"), Some(true));
        assert!(record.name.is_none());
    }
}
