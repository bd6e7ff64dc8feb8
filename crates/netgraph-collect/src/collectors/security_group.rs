use super::{collect_with, get_str, CollectorContext};
use async_trait::async_trait;
use netgraph_core::{CollectionOutcome, Collector, ResourceRecord, ResourceType};
use serde_json::{json, Value};
use std::sync::Arc;

/// Collects security groups and flattens their permission sets into the
/// rule shape the posture checks consume: each rule carries a protocol,
/// an optional port range, and the list of CIDR ranges it opens.
pub struct SecurityGroupCollector {
    ctx: Arc<CollectorContext>,
}

impl SecurityGroupCollector {
    pub fn new(ctx: Arc<CollectorContext>) -> Self {
        Self { ctx }
    }

    fn normalize_rules(permissions: Option<&Value>) -> Vec<Value> {
        let Some(perms) = permissions.and_then(Value::as_array) else {
            return Vec::new();
        };
        perms
            .iter()
            .map(|perm| {
                let mut ranges: Vec<Value> = perm
                    .get("IpRanges")
                    .and_then(Value::as_array)
                    .map(|rs| {
                        rs.iter()
                            .filter_map(|r| r.get("CidrIp").and_then(Value::as_str))
                            .map(|cidr| json!({"cidr": cidr}))
                            .collect()
                    })
                    .unwrap_or_default();
                if let Some(v6) = perm.get("Ipv6Ranges").and_then(Value::as_array) {
                    ranges.extend(
                        v6.iter()
                            .filter_map(|r| r.get("CidrIpv6").and_then(Value::as_str))
                            .map(|cidr| json!({"cidr": cidr})),
                    );
                }
                json!({
                    "ip_protocol": perm.get("IpProtocol").and_then(Value::as_str).unwrap_or("-1"),
                    "from_port": perm.get("FromPort").cloned().unwrap_or(Value::Null),
                    "to_port": perm.get("ToPort").cloned().unwrap_or(Value::Null),
                    "ip_ranges": ranges,
                })
            })
            .collect()
    }

    fn normalize(item: &Value, region: &str) -> Option<ResourceRecord> {
        let id = get_str(item, "GroupId")?;
        let mut record = ResourceRecord::new(id, ResourceType::SecurityGroup, region)
            .with_name(get_str(item, "GroupName").unwrap_or_default())
            .with_attr(
                "ingress_rules",
                Value::Array(Self::normalize_rules(item.get("IpPermissions"))),
            )
            .with_attr(
                "egress_rules",
                Value::Array(Self::normalize_rules(item.get("IpPermissionsEgress"))),
            )
            .with_attr("raw", item.clone());
        if let Some(vpc_id) = get_str(item, "VpcId") {
            record = record.with_attr("vpc_id", json!(vpc_id));
        }
        if let Some(description) = get_str(item, "Description") {
            record = record.with_attr("description", json!(description));
        }
        Some(record)
    }
}

#[async_trait]
impl Collector for SecurityGroupCollector {
    fn resource_type(&self) -> ResourceType {
        ResourceType::SecurityGroup
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
    fn flattens_ingress_permissions() {
        let item = json!({
            "GroupId": "sg-1",
            "GroupName": "web",
            "VpcId": "vpc-1",
            "IpPermissions": [{
                "IpProtocol": "tcp",
                "FromPort": 443,
                "ToPort": 443,
                "IpRanges": [{"CidrIp": "0.0.0.0/0"}],
                "Ipv6Ranges": [{"CidrIpv6": "::/0"}]
            }]
        });
        let record = SecurityGroupCollector::normalize(&item, "us-east-1").unwrap();
        let rules = record.attributes["ingress_rules"].as_array().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0]["ip_protocol"], "tcp");
        assert_eq!(rules[0]["from_port"], 443);
        let cidrs: Vec<_> = rules[0]["ip_ranges"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["cidr"].as_str().unwrap())
            .collect();
        assert_eq!(cidrs, vec!["0.0.0.0/0", "::/0"]);
    }

    #[test]
    fn group_without_permissions_yields_empty_rule_lists() {
        let record =
            SecurityGroupCollector::normalize(&json!({"GroupId": "sg-2"}), "us-east-1").unwrap();
        assert!(record.attributes["ingress_rules"].as_array().unwrap().is_empty());
        assert!(record.attributes["egress_rules"].as_array().unwrap().is_empty());
    }
}
