use super::{collect_ids, collect_with, get_str, name_from_tags, tags_map, CollectorContext};
use async_trait::async_trait;
use netgraph_core::{CollectionOutcome, Collector, ResourceRecord, ResourceType};
use serde_json::Value;
use std::sync::Arc;

pub struct InternetGatewayCollector {
    ctx: Arc<CollectorContext>,
}

impl InternetGatewayCollector {
    pub fn new(ctx: Arc<CollectorContext>) -> Self {
        Self { ctx }
    }

    fn normalize(item: &Value, region: &str) -> Option<ResourceRecord> {
        let id = get_str(item, "InternetGatewayId")?;
        // A gateway can be detached; attached_vpc_ids is then empty and the
        // node stays in the graph without AttachedTo edges.
        let attached = collect_ids(item, "Attachments", "VpcId");
        Some(
            ResourceRecord::new(id, ResourceType::InternetGateway, region)
                .with_name(name_from_tags(item))
                .with_attr("attached_vpc_ids", Value::Array(attached))
                .with_attr("tags", Value::Object(tags_map(item)))
                .with_attr("raw", item.clone()),
        )
    }
}

#[async_trait]
impl Collector for InternetGatewayCollector {
    fn resource_type(&self) -> ResourceType {
        ResourceType::InternetGateway
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
    use serde_json::json;

    #[test]
    fn extracts_attachments() {
        let item = json!({
            "InternetGatewayId": "igw-1",
            "Attachments": [{"VpcId": "vpc-1", "State": "available"}]
        });
        let record = InternetGatewayCollector::normalize(&item, "us-east-1").unwrap();
        assert_eq!(record.attr_str_list("attached_vpc_ids"), vec!["vpc-1"]);
    }

    #[test]
    fn detached_gateway_has_empty_attachment_list() {
        let record =
            InternetGatewayCollector::normalize(&json!({"InternetGatewayId": "igw-2"}), "us-east-1")
                .unwrap();
        assert!(record.attr_str_list("attached_vpc_ids").is_empty());
    }
}
