use super::{collect_ids, collect_with, get_str, name_from_tags, tags_map, CollectorContext};
use async_trait::async_trait;
use netgraph_core::{CollectionOutcome, Collector, ResourceRecord, ResourceType};
use serde_json::{json, Value};
use std::sync::Arc;

/// Collects route tables. Routes keep their destination and whichever
/// gateway target the provider filled in; associations are reduced to the
/// subnet ids the table routes for.
pub struct RouteTableCollector {
    ctx: Arc<CollectorContext>,
}

impl RouteTableCollector {
    pub fn new(ctx: Arc<CollectorContext>) -> Self {
        Self { ctx }
    }

    fn normalize(item: &Value, region: &str) -> Option<ResourceRecord> {
        let id = get_str(item, "RouteTableId")?;
        let routes: Vec<Value> = item
            .get("Routes")
            .and_then(Value::as_array)
            .map(|rs| {
                rs.iter()
                    .map(|r| {
                        json!({
                            "destination": r.get("DestinationCidrBlock")
                                .or_else(|| r.get("DestinationIpv6CidrBlock"))
                                .cloned()
                                .unwrap_or(Value::Null),
                            "gateway_id": r.get("GatewayId")
                                .or_else(|| r.get("NatGatewayId"))
                                .or_else(|| r.get("TransitGatewayId"))
                                .cloned()
                                .unwrap_or(Value::Null),
                            "state": r.get("State").cloned().unwrap_or(Value::Null),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        let is_main = item
            .get("Associations")
            .and_then(Value::as_array)
            .map(|assocs| {
                assocs
                    .iter()
                    .any(|a| a.get("Main").and_then(Value::as_bool).unwrap_or(false))
            })
            .unwrap_or(false);
        let mut record = ResourceRecord::new(id, ResourceType::RouteTable, region)
            .with_name(name_from_tags(item))
            .with_attr("routes", Value::Array(routes))
            .with_attr(
                "subnet_ids",
                Value::Array(collect_ids(item, "Associations", "SubnetId")),
            )
            .with_attr("is_main", json!(is_main))
            .with_attr("tags", Value::Object(tags_map(item)))
            .with_attr("raw", item.clone());
        if let Some(vpc_id) = get_str(item, "VpcId") {
            record = record.with_attr("vpc_id", json!(vpc_id));
        }
        Some(record)
    }
}

#[async_trait]
impl Collector for RouteTableCollector {
    fn resource_type(&self) -> ResourceType {
        ResourceType::RouteTable
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
    fn normalizes_routes_and_associations() {
        let item = json!({
            "RouteTableId": "rtb-1",
            "VpcId": "vpc-1",
            "Routes": [
                {"DestinationCidrBlock": "0.0.0.0/0", "GatewayId": "igw-1", "State": "active"},
                {"DestinationCidrBlock": "10.1.0.0/16", "TransitGatewayId": "tgw-1"}
            ],
            "Associations": [
                {"SubnetId": "subnet-1"},
                {"Main": true}
            ]
        });
        let record = RouteTableCollector::normalize(&item, "us-east-1").unwrap();
        let routes = record.attributes["routes"].as_array().unwrap();
        assert_eq!(routes[0]["gateway_id"], "igw-1");
        assert_eq!(routes[1]["gateway_id"], "tgw-1");
        assert_eq!(record.attr_str_list("subnet_ids"), vec!["subnet-1"]);
        assert_eq!(record.attr_bool("is_main"), Some(true));
    }
}
