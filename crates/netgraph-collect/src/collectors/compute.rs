use super::{
    collect_ids, collect_with, get_nested_str, get_str, name_from_tags, tags_map, CollectorContext,
};
use async_trait::async_trait;
use netgraph_core::{CollectionOutcome, Collector, ResourceRecord, ResourceType};
use serde_json::{json, Value};
use std::sync::Arc;

/// Collects compute instances. Instances carry the densest reference set in
/// the topology: subnet placement plus the security groups protecting them.
pub struct ComputeCollector {
    ctx: Arc<CollectorContext>,
}

impl ComputeCollector {
    pub fn new(ctx: Arc<CollectorContext>) -> Self {
        Self { ctx }
    }

    fn normalize(item: &Value, region: &str) -> Option<ResourceRecord> {
        let id = get_str(item, "InstanceId")?;
        let mut record = ResourceRecord::new(id, ResourceType::ComputeInstance, region)
            .with_name(name_from_tags(item))
            .with_attr("tags", Value::Object(tags_map(item)))
            .with_attr("raw", item.clone());
        if let Some(vpc_id) = get_str(item, "VpcId") {
            record = record.with_attr("vpc_id", json!(vpc_id));
        }
        if let Some(subnet_id) = get_str(item, "SubnetId") {
            record = record.with_attr("subnet_id", json!(subnet_id));
        }
        if let Some(instance_type) = get_str(item, "InstanceType") {
            record = record.with_attr("instance_type", json!(instance_type));
        }
        if let Some(state) = get_nested_str(item, "State", "Name") {
            record = record.with_attr("state", json!(state));
        }
        if let Some(az) = get_nested_str(item, "Placement", "AvailabilityZone") {
            record = record.with_attr("availability_zone", json!(az));
        }
        if let Some(ip) = get_str(item, "PrivateIpAddress") {
            record = record.with_attr("private_ip", json!(ip));
        }
        if let Some(ip) = get_str(item, "PublicIpAddress") {
            record = record.with_attr("public_ip", json!(ip));
        }
        let sg_ids = collect_ids(item, "SecurityGroups", "GroupId");
        record = record.with_attr("security_group_ids", Value::Array(sg_ids));
        Some(record)
    }
}

#[async_trait]
impl Collector for ComputeCollector {
    fn resource_type(&self) -> ResourceType {
        ResourceType::ComputeInstance
    }

    fn service(&self) -> &'static str {
        "compute"
    }

    async fn collect(&self, region: &str) -> CollectionOutcome {
        collect_with(&self.ctx, self.service(), self.resource_type(), region, Self::normalize).await
    }
}
