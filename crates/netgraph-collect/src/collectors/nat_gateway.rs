use super::{collect_with, get_str, name_from_tags, tags_map, CollectorContext};
use async_trait::async_trait;
use netgraph_core::{CollectionOutcome, Collector, ResourceRecord, ResourceType};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct NatGatewayCollector {
    ctx: Arc<CollectorContext>,
}

impl NatGatewayCollector {
    pub fn new(ctx: Arc<CollectorContext>) -> Self {
        Self { ctx }
    }

    fn normalize(item: &Value, region: &str) -> Option<ResourceRecord> {
        let id = get_str(item, "NatGatewayId")?;
        let public_ips: Vec<Value> = item
            .get("NatGatewayAddresses")
            .and_then(Value::as_array)
            .map(|addrs| {
                addrs
                    .iter()
                    .filter_map(|a| a.get("PublicIp").and_then(Value::as_str))
                    .map(|ip| json!(ip))
                    .collect()
            })
            .unwrap_or_default();
        let mut record = ResourceRecord::new(id, ResourceType::NatGateway, region)
            .with_name(name_from_tags(item))
            .with_attr("public_ips", Value::Array(public_ips))
            .with_attr("tags", Value::Object(tags_map(item)))
            .with_attr("raw", item.clone());
        if let Some(vpc_id) = get_str(item, "VpcId") {
            record = record.with_attr("vpc_id", json!(vpc_id));
        }
        if let Some(subnet_id) = get_str(item, "SubnetId") {
            record = record.with_attr("subnet_id", json!(subnet_id));
        }
        if let Some(state) = get_str(item, "State") {
            record = record.with_attr("state", json!(state));
        }
        if let Some(kind) = get_str(item, "ConnectivityType") {
            record = record.with_attr("connectivity_type", json!(kind));
        }
        Some(record)
    }
}

#[async_trait]
impl Collector for NatGatewayCollector {
    fn resource_type(&self) -> ResourceType {
        ResourceType::NatGateway
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
    fn normalizes_placement_and_addresses() {
        let item = json!({
            "NatGatewayId": "nat-1",
            "VpcId": "vpc-1",
            "SubnetId": "subnet-1",
            "State": "available",
            "NatGatewayAddresses": [{"PublicIp": "52.1.2.3"}]
        });
        let record = NatGatewayCollector::normalize(&item, "us-east-1").unwrap();
        assert_eq!(record.attr_str("subnet_id").as_deref(), Some("subnet-1"));
        assert_eq!(record.attr_str_list("public_ips"), vec!["52.1.2.3"]);
    }
}
