use super::{collect_with, get_bool, get_nested_str, get_str, CollectorContext};
use async_trait::async_trait;
use netgraph_core::{CollectionOutcome, Collector, ResourceRecord, ResourceType};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct DatabaseCollector {
    ctx: Arc<CollectorContext>,
}

impl DatabaseCollector {
    pub fn new(ctx: Arc<CollectorContext>) -> Self {
        Self { ctx }
    }

    fn normalize(item: &Value, region: &str) -> Option<ResourceRecord> {
        let id = get_str(item, "DBInstanceIdentifier")?;
        let subnet_ids: Vec<Value> = item
            .get("DBSubnetGroup")
            .and_then(|g| g.get("Subnets"))
            .and_then(Value::as_array)
            .map(|subnets| {
                subnets
                    .iter()
                    .filter_map(|s| s.get("SubnetIdentifier").and_then(Value::as_str))
                    .map(|s| json!(s))
                    .collect()
            })
            .unwrap_or_default();
        let security_groups: Vec<Value> = item
            .get("VpcSecurityGroups")
            .and_then(Value::as_array)
            .map(|sgs| {
                sgs.iter()
                    .filter_map(|s| s.get("VpcSecurityGroupId").and_then(Value::as_str))
                    .map(|s| json!(s))
                    .collect()
            })
            .unwrap_or_default();
        let mut record = ResourceRecord::new(id.clone(), ResourceType::DatabaseInstance, region)
            .with_name(id)
            .with_attr("subnet_ids", Value::Array(subnet_ids))
            .with_attr("security_group_ids", Value::Array(security_groups))
            .with_attr("raw", item.clone());
        if let Some(vpc_id) = get_nested_str(item, "DBSubnetGroup", "VpcId") {
            record = record.with_attr("vpc_id", json!(vpc_id));
        }
        if let Some(engine) = get_str(item, "Engine") {
            record = record.with_attr("engine", json!(engine));
        }
        if let Some(class) = get_str(item, "DBInstanceClass") {
            record = record.with_attr("instance_class", json!(class));
        }
        if let Some(public) = get_bool(item, "PubliclyAccessible") {
            record = record.with_attr("publicly_accessible", json!(public));
        }
        if let Some(encrypted) = get_bool(item, "StorageEncrypted") {
            record = record.with_attr("storage_encrypted", json!(encrypted));
        }
        if let Some(endpoint) = get_nested_str(item, "Endpoint", "Address") {
            record = record.with_attr("endpoint", json!(endpoint));
        }
        Some(record)
    }
}

#[async_trait]
impl Collector for DatabaseCollector {
    fn resource_type(&self) -> ResourceType {
        ResourceType::DatabaseInstance
    }

    fn service(&self) -> &'static str {
        "database"
    }

    async fn collect(&self, region: &str) -> CollectionOutcome {
        collect_with(&self.ctx, self.service(), self.resource_type(), region, Self::normalize).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_placement_and_protection() {
        let item = json!({
            "DBInstanceIdentifier": "orders-db",
            "Engine": "postgres",
            "PubliclyAccessible": false,
            "StorageEncrypted": true,
            "DBSubnetGroup": {
                "VpcId": "vpc-1",
                "Subnets": [{"SubnetIdentifier": "subnet-1"}]
            },
            "VpcSecurityGroups": [{"VpcSecurityGroupId": "sg-db"}]
        });
        let record = DatabaseCollector::normalize(&item, "us-east-1").unwrap();
        assert_eq!(record.attr_str("vpc_id").as_deref(), Some("vpc-1"));
        assert_eq!(record.attr_str_list("subnet_ids"), vec!["subnet-1"]);
        assert_eq!(record.attr_str_list("security_group_ids"), vec!["sg-db"]);
        assert_eq!(record.attr_bool("storage_encrypted"), Some(true));
    }
}
