use super::{collect_ids, collect_with, get_bool, get_str, name_from_tags, tags_map, CollectorContext};
use async_trait::async_trait;
use netgraph_core::{CollectionOutcome, Collector, ResourceRecord, ResourceType};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct NetworkAclCollector {
    ctx: Arc<CollectorContext>,
}

impl NetworkAclCollector {
    pub fn new(ctx: Arc<CollectorContext>) -> Self {
        Self { ctx }
    }

    fn normalize(item: &Value, region: &str) -> Option<ResourceRecord> {
        let id = get_str(item, "NetworkAclId")?;
        let entries: Vec<Value> = item
            .get("Entries")
            .and_then(Value::as_array)
            .map(|es| {
                es.iter()
                    .map(|e| {
                        json!({
                            "rule_number": e.get("RuleNumber").cloned().unwrap_or(Value::Null),
                            "protocol": e.get("Protocol").cloned().unwrap_or(Value::Null),
                            "action": e.get("RuleAction").cloned().unwrap_or(Value::Null),
                            "egress": e.get("Egress").cloned().unwrap_or(Value::Null),
                            "cidr": e.get("CidrBlock").cloned().unwrap_or(Value::Null),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        let mut record = ResourceRecord::new(id, ResourceType::NetworkAcl, region)
            .with_name(name_from_tags(item))
            .with_attr("entries", Value::Array(entries))
            .with_attr(
                "subnet_ids",
                Value::Array(collect_ids(item, "Associations", "SubnetId")),
            )
            .with_attr("tags", Value::Object(tags_map(item)))
            .with_attr("raw", item.clone());
        if let Some(vpc_id) = get_str(item, "VpcId") {
            record = record.with_attr("vpc_id", json!(vpc_id));
        }
        if let Some(default) = get_bool(item, "IsDefault") {
            record = record.with_attr("is_default", json!(default));
        }
        Some(record)
    }
}

#[async_trait]
impl Collector for NetworkAclCollector {
    fn resource_type(&self) -> ResourceType {
        ResourceType::NetworkAcl
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
    fn normalizes_entries_and_subnets() {
        let item = json!({
            "NetworkAclId": "acl-1",
            "VpcId": "vpc-1",
            "IsDefault": true,
            "Entries": [{"RuleNumber": 100, "RuleAction": "allow", "CidrBlock": "0.0.0.0/0"}],
            "Associations": [{"SubnetId": "subnet-1"}, {"SubnetId": "subnet-2"}]
        });
        let record = NetworkAclCollector::normalize(&item, "us-east-1").unwrap();
        assert_eq!(record.attr_str_list("subnet_ids"), vec!["subnet-1", "subnet-2"]);
        assert_eq!(record.attributes["entries"][0]["action"], "allow");
    }
}
