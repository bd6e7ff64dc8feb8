use super::{collect_with, get_str, name_from_tags, tags_map, CollectorContext};
use async_trait::async_trait;
use netgraph_core::{CollectionOutcome, Collector, ResourceRecord, ResourceType};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct VpnConnectionCollector {
    ctx: Arc<CollectorContext>,
}

impl VpnConnectionCollector {
    pub fn new(ctx: Arc<CollectorContext>) -> Self {
        Self { ctx }
    }

    fn normalize(item: &Value, region: &str) -> Option<ResourceRecord> {
        let id = get_str(item, "VpnConnectionId")?;
        let mut record = ResourceRecord::new(id, ResourceType::VpnConnection, region)
            .with_name(name_from_tags(item))
            .with_attr("tags", Value::Object(tags_map(item)))
            .with_attr("raw", item.clone());
        if let Some(state) = get_str(item, "State") {
            record = record.with_attr("state", json!(state));
        }
        if let Some(kind) = get_str(item, "Type") {
            record = record.with_attr("connection_type", json!(kind));
        }
        if let Some(tgw) = get_str(item, "TransitGatewayId") {
            record = record.with_attr("transit_gateway_id", json!(tgw));
        }
        if let Some(vgw) = get_str(item, "VpnGatewayId") {
            record = record.with_attr("vpn_gateway_id", json!(vgw));
        }
        if let Some(cgw) = get_str(item, "CustomerGatewayId") {
            record = record.with_attr("customer_gateway_id", json!(cgw));
        }
        Some(record)
    }
}

#[async_trait]
impl Collector for VpnConnectionCollector {
    fn resource_type(&self) -> ResourceType {
        ResourceType::VpnConnection
    }

    fn service(&self) -> &'static str {
        "network"
    }

    async fn collect(&self, region: &str) -> CollectionOutcome {
        collect_with(&self.ctx, self.service(), self.resource_type(), region, Self::normalize).await
    }
}
