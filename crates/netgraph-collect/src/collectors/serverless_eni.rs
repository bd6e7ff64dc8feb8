use super::{collect_ids, collect_with, get_str, CollectorContext};
use async_trait::async_trait;
use netgraph_core::{CollectionOutcome, Collector, ResourceRecord, ResourceType};
use serde_json::{json, Value};
use std::sync::Arc;

/// Collects the network interfaces that serverless functions project into a
/// VPC. These are how function traffic shows up in the topology.
pub struct ServerlessEniCollector {
    ctx: Arc<CollectorContext>,
}

impl ServerlessEniCollector {
    pub fn new(ctx: Arc<CollectorContext>) -> Self {
        Self { ctx }
    }

    fn normalize(item: &Value, region: &str) -> Option<ResourceRecord> {
        let id = get_str(item, "NetworkInterfaceId")?;
        let mut record = ResourceRecord::new(id, ResourceType::ServerlessEni, region)
            .with_name(get_str(item, "Description").unwrap_or_default())
            .with_attr(
                "security_group_ids",
                Value::Array(collect_ids(item, "Groups", "GroupId")),
            )
            .with_attr("raw", item.clone());
        if let Some(vpc_id) = get_str(item, "VpcId") {
            record = record.with_attr("vpc_id", json!(vpc_id));
        }
        if let Some(subnet_id) = get_str(item, "SubnetId") {
            record = record.with_attr("subnet_id", json!(subnet_id));
        }
        if let Some(ip) = get_str(item, "PrivateIpAddress") {
            record = record.with_attr("private_ip", json!(ip));
        }
        if let Some(status) = get_str(item, "Status") {
            record = record.with_attr("status", json!(status));
        }
        if let Some(kind) = get_str(item, "InterfaceType") {
            record = record.with_attr("interface_type", json!(kind));
        }
        Some(record)
    }
}

#[async_trait]
impl Collector for ServerlessEniCollector {
    fn resource_type(&self) -> ResourceType {
        ResourceType::ServerlessEni
    }

    fn service(&self) -> &'static str {
        "serverless"
    }

    async fn collect(&self, region: &str) -> CollectionOutcome {
        collect_with(&self.ctx, self.service(), self.resource_type(), region, Self::normalize).await
    }
}
