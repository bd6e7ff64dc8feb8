use super::{collect_ids, collect_with, get_nested_str, get_str, CollectorContext};
use async_trait::async_trait;
use netgraph_core::{CollectionOutcome, Collector, ResourceRecord, ResourceType};
use serde_json::{json, Value};
use std::sync::Arc;

/// Collects load balancers, including their registered compute targets so
/// the builder can model traffic flow with RoutesTo edges.
pub struct LoadBalancerCollector {
    ctx: Arc<CollectorContext>,
}

impl LoadBalancerCollector {
    pub fn new(ctx: Arc<CollectorContext>) -> Self {
        Self { ctx }
    }

    fn normalize(item: &Value, region: &str) -> Option<ResourceRecord> {
        let id = get_str(item, "LoadBalancerArn")?;
        let security_groups: Vec<Value> = item
            .get("SecurityGroups")
            .and_then(Value::as_array)
            .map(|sgs| {
                sgs.iter()
                    .filter_map(Value::as_str)
                    .map(|s| json!(s))
                    .collect()
            })
            .unwrap_or_default();
        let mut record = ResourceRecord::new(id, ResourceType::LoadBalancer, region)
            .with_name(get_str(item, "LoadBalancerName").unwrap_or_default())
            .with_attr(
                "subnet_ids",
                Value::Array(collect_ids(item, "AvailabilityZones", "SubnetId")),
            )
            .with_attr("security_group_ids", Value::Array(security_groups))
            .with_attr(
                "target_instance_ids",
                Value::Array(collect_ids(item, "Targets", "Id")),
            )
            .with_attr("raw", item.clone());
        if let Some(vpc_id) = get_str(item, "VpcId") {
            record = record.with_attr("vpc_id", json!(vpc_id));
        }
        if let Some(scheme) = get_str(item, "Scheme") {
            record = record.with_attr("scheme", json!(scheme));
        }
        if let Some(kind) = get_str(item, "Type") {
            record = record.with_attr("lb_type", json!(kind));
        }
        if let Some(state) = get_nested_str(item, "State", "Code") {
            record = record.with_attr("state", json!(state));
        }
        if let Some(dns) = get_str(item, "DNSName") {
            record = record.with_attr("dns_name", json!(dns));
        }
        Some(record)
    }
}

#[async_trait]
impl Collector for LoadBalancerCollector {
    fn resource_type(&self) -> ResourceType {
        ResourceType::LoadBalancer
    }

    fn service(&self) -> &'static str {
        "loadbalancing"
    }

    async fn collect(&self, region: &str) -> CollectionOutcome {
        collect_with(&self.ctx, self.service(), self.resource_type(), region, Self::normalize).await
    }
}
