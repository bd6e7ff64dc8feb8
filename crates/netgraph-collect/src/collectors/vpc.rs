use super::{collect_with, get_bool, get_str, name_from_tags, tags_map, CollectorContext};
use async_trait::async_trait;
use netgraph_core::{CollectionOutcome, Collector, ResourceRecord, ResourceType};
use serde_json::{json, Value};
use std::sync::Arc;

/// Collects VPCs, the containment roots of the topology.
pub struct VpcCollector {
    ctx: Arc<CollectorContext>,
}

impl VpcCollector {
    pub fn new(ctx: Arc<CollectorContext>) -> Self {
        Self { ctx }
    }

    fn normalize(item: &Value, region: &str) -> Option<ResourceRecord> {
        let id = get_str(item, "VpcId")?;
        let mut record = ResourceRecord::new(id, ResourceType::Vpc, region)
            .with_name(name_from_tags(item))
            .with_attr("tags", Value::Object(tags_map(item)))
            .with_attr("raw", item.clone());
        if let Some(cidr) = get_str(item, "CidrBlock") {
            record = record.with_attr("cidr_block", json!(cidr));
        }
        if let Some(state) = get_str(item, "State") {
            record = record.with_attr("state", json!(state));
        }
        if let Some(default) = get_bool(item, "IsDefault") {
            record = record.with_attr("is_default", json!(default));
        }
        if let Some(tenancy) = get_str(item, "InstanceTenancy") {
            record = record.with_attr("instance_tenancy", json!(tenancy));
        }
        Some(record)
    }
}

#[async_trait]
impl Collector for VpcCollector {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Vpc
    }

    fn service(&self) -> &'static str {
        "network"
    }

    async fn collect(&self, region: &str) -> CollectionOutcome {
        collect_with(&self.ctx, self.service(), self.resource_type(), region, Self::normalize).await
    }
}
