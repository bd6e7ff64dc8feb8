use crate::{ApiRateLimiter, RetryPolicy};
use netgraph_core::{
    CollectionError, CollectionOutcome, Collector, ProviderClient, ResourceRecord, ResourceType,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

mod compute;
mod database;
mod dedicated_link;
mod internet_gateway;
mod load_balancer;
mod nat_gateway;
mod network_acl;
mod route_table;
mod security_group;
mod serverless_eni;
mod subnet;
mod transit_gateway;
mod vpc;
mod vpc_peering;
mod vpn_connection;

pub use compute::ComputeCollector;
pub use database::DatabaseCollector;
pub use dedicated_link::DedicatedLinkCollector;
pub use internet_gateway::InternetGatewayCollector;
pub use load_balancer::LoadBalancerCollector;
pub use nat_gateway::NatGatewayCollector;
pub use network_acl::NetworkAclCollector;
pub use route_table::RouteTableCollector;
pub use security_group::SecurityGroupCollector;
pub use serverless_eni::ServerlessEniCollector;
pub use subnet::SubnetCollector;
pub use transit_gateway::TransitGatewayCollector;
pub use vpc::VpcCollector;
pub use vpc_peering::VpcPeeringCollector;
pub use vpn_connection::VpnConnectionCollector;

/// Shared plumbing handed to every collector: the provider boundary plus
/// the rate limiter and retry policy that gate each page fetch, and the
/// absolute deadline for the whole run.
pub struct CollectorContext {
    pub provider: Arc<dyn ProviderClient>,
    pub limiter: Arc<ApiRateLimiter>,
    pub retry: Arc<RetryPolicy>,
    pub deadline: Instant,
}

/// Drain provider pagination for one (resource type, region) query.
///
/// Every page goes through the rate limiter and then the retry policy. On a
/// page-level terminal failure, the items fetched so far are returned
/// alongside the error; progress is never discarded. A retry attempt that
/// is in flight when the run deadline passes may finish, but no further
/// page is requested after it.
pub(crate) async fn drain_pages(
    ctx: &CollectorContext,
    service: &'static str,
    resource_type: &ResourceType,
    region: &str,
) -> (Vec<Value>, Option<CollectionError>) {
    let op_name = format!("{}:list_{}", service, resource_type);
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        if Instant::now() >= ctx.deadline {
            debug!(
                resource_type = %resource_type,
                region,
                pages,
                partial_items = items.len(),
                "run deadline reached, stopping pagination"
            );
            return (items, Some(CollectionError::DeadlineExceeded));
        }
        let current = token.clone();
        let result = ctx
            .retry
            .execute(&op_name, || {
                let current = current.clone();
                async move {
                    ctx.limiter.acquire(service, region).await?;
                    ctx.provider
                        .list_page(resource_type, region, current.as_deref())
                        .await
                }
            })
            .await;

        match result {
            Ok(page) => {
                items.extend(page.items);
                pages += 1;
                match page.next_token {
                    Some(next) => token = Some(next),
                    None => break,
                }
            }
            Err(error) => {
                debug!(
                    resource_type = %resource_type,
                    region,
                    pages,
                    partial_items = items.len(),
                    "pagination aborted, returning partial results"
                );
                return (items, Some(error));
            }
        }
    }

    debug!(
        resource_type = %resource_type,
        region,
        pages,
        items = items.len(),
        "pagination drained"
    );
    (items, None)
}

/// Common collect body: drain pages, normalize each item, keep whatever
/// error ended pagination early.
pub(crate) async fn collect_with<N>(
    ctx: &CollectorContext,
    service: &'static str,
    resource_type: ResourceType,
    region: &str,
    normalize: N,
) -> CollectionOutcome
where
    N: Fn(&Value, &str) -> Option<ResourceRecord>,
{
    let (items, error) = drain_pages(ctx, service, &resource_type, region).await;
    let mut records = Vec::with_capacity(items.len());
    for item in &items {
        match normalize(item, region) {
            Some(record) => records.push(record),
            None => debug!(resource_type = %resource_type, region, "skipping item without identifier"),
        }
    }
    CollectionOutcome { records, error }
}

/// Build the full collector registry keyed by resource type.
pub fn build_collectors(ctx: Arc<CollectorContext>) -> HashMap<ResourceType, Arc<dyn Collector>> {
    let mut registry: HashMap<ResourceType, Arc<dyn Collector>> = HashMap::new();
    registry.insert(ResourceType::Vpc, Arc::new(VpcCollector::new(ctx.clone())));
    registry.insert(ResourceType::Subnet, Arc::new(SubnetCollector::new(ctx.clone())));
    registry.insert(
        ResourceType::ComputeInstance,
        Arc::new(ComputeCollector::new(ctx.clone())),
    );
    registry.insert(
        ResourceType::InternetGateway,
        Arc::new(InternetGatewayCollector::new(ctx.clone())),
    );
    registry.insert(
        ResourceType::NatGateway,
        Arc::new(NatGatewayCollector::new(ctx.clone())),
    );
    registry.insert(
        ResourceType::TransitGateway,
        Arc::new(TransitGatewayCollector::new(ctx.clone())),
    );
    registry.insert(
        ResourceType::SecurityGroup,
        Arc::new(SecurityGroupCollector::new(ctx.clone())),
    );
    registry.insert(
        ResourceType::RouteTable,
        Arc::new(RouteTableCollector::new(ctx.clone())),
    );
    registry.insert(
        ResourceType::NetworkAcl,
        Arc::new(NetworkAclCollector::new(ctx.clone())),
    );
    registry.insert(
        ResourceType::VpcPeering,
        Arc::new(VpcPeeringCollector::new(ctx.clone())),
    );
    registry.insert(
        ResourceType::VpnConnection,
        Arc::new(VpnConnectionCollector::new(ctx.clone())),
    );
    registry.insert(
        ResourceType::DedicatedLink,
        Arc::new(DedicatedLinkCollector::new(ctx.clone())),
    );
    registry.insert(
        ResourceType::LoadBalancer,
        Arc::new(LoadBalancerCollector::new(ctx.clone())),
    );
    registry.insert(
        ResourceType::DatabaseInstance,
        Arc::new(DatabaseCollector::new(ctx.clone())),
    );
    registry.insert(
        ResourceType::ServerlessEni,
        Arc::new(ServerlessEniCollector::new(ctx)),
    );
    registry
}

// Normalization helpers shared by the concrete collectors. Provider items
// arrive as open JSON objects; known fields are lifted into stable
// attribute names and the untouched item is kept under "raw".

pub(crate) fn get_str(item: &Value, key: &str) -> Option<String> {
    item.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn get_bool(item: &Value, key: &str) -> Option<bool> {
    item.get(key).and_then(Value::as_bool)
}

pub(crate) fn get_nested_str(item: &Value, outer: &str, inner: &str) -> Option<String> {
    item.get(outer)
        .and_then(|v| v.get(inner))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Collect `inner` string fields from a list attribute, skipping nulls.
pub(crate) fn collect_ids(item: &Value, list_key: &str, id_key: &str) -> Vec<Value> {
    item.get(list_key)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.get(id_key).and_then(Value::as_str))
                .map(|s| json!(s))
                .collect()
        })
        .unwrap_or_default()
}

/// Provider tags arrive as a list of {Key, Value} pairs; flatten to a map.
pub(crate) fn tags_map(item: &Value) -> Map<String, Value> {
    let mut map = Map::new();
    if let Some(tags) = item.get("Tags").and_then(Value::as_array) {
        for tag in tags {
            if let (Some(key), Some(value)) = (
                tag.get("Key").and_then(Value::as_str),
                tag.get("Value").and_then(Value::as_str),
            ) {
                map.insert(key.to_string(), json!(value));
            }
        }
    }
    map
}

pub(crate) fn name_from_tags(item: &Value) -> String {
    tags_map(item)
        .get("Name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn pagination_is_fully_drained() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.script(
            &ResourceType::Vpc,
            "us-east-1",
            vec![
                page(vec![json!({"VpcId": "vpc-1"})], Some("t1")),
                page(vec![json!({"VpcId": "vpc-2"})], Some("t2")),
                page(vec![json!({"VpcId": "vpc-3"})], None),
            ],
        );
        let ctx = test_context(provider);

        let (items, error) = drain_pages(&ctx, "network", &ResourceType::Vpc, "us-east-1").await;
        assert!(error.is_none());
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn mid_pagination_fatal_error_keeps_partial_results() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.script(
            &ResourceType::Vpc,
            "us-east-1",
            vec![
                page(vec![json!({"VpcId": "vpc-1"}), json!({"VpcId": "vpc-2"})], Some("t1")),
                Err(netgraph_core::ProviderError::Auth("expired".into())),
            ],
        );
        let ctx = test_context(provider);

        let (items, error) = drain_pages(&ctx, "network", &ResourceType::Vpc, "us-east-1").await;
        assert_eq!(items.len(), 2);
        assert!(matches!(error, Some(CollectionError::Fatal(_))));
    }

    #[tokio::test]
    async fn pagination_stops_at_the_run_deadline_with_partials() {
        use async_trait::async_trait;
        use netgraph_core::{ProviderError, ResourcePage};
        use std::time::Duration;

        // Each page takes long enough that the deadline passes while the
        // first one is in flight.
        struct SlowProvider {
            inner: ScriptedProvider,
        }

        #[async_trait]
        impl netgraph_core::ProviderClient for SlowProvider {
            async fn list_page(
                &self,
                resource_type: &ResourceType,
                region: &str,
                page_token: Option<&str>,
            ) -> Result<ResourcePage, ProviderError> {
                tokio::time::sleep(Duration::from_millis(80)).await;
                self.inner.list_page(resource_type, region, page_token).await
            }
        }

        let scripted = ScriptedProvider::new();
        scripted.script(
            &ResourceType::Vpc,
            "us-east-1",
            vec![
                page(vec![json!({"VpcId": "vpc-1"})], Some("t1")),
                page(vec![json!({"VpcId": "vpc-2"})], None),
            ],
        );
        let ctx = test_context_with_deadline(
            Arc::new(SlowProvider { inner: scripted }),
            tokio::time::Instant::now() + Duration::from_millis(20),
        );

        let (items, error) = drain_pages(&ctx, "network", &ResourceType::Vpc, "us-east-1").await;
        // The in-flight first page finished; the second was never requested.
        assert_eq!(items.len(), 1);
        assert!(matches!(error, Some(CollectionError::DeadlineExceeded)));
    }

    #[test]
    fn tag_helpers() {
        let item = json!({
            "Tags": [
                {"Key": "Name", "Value": "prod"},
                {"Key": "team", "Value": "net"}
            ]
        });
        assert_eq!(name_from_tags(&item), "prod");
        assert_eq!(tags_map(&item).len(), 2);
        assert_eq!(name_from_tags(&json!({})), "");
    }
}
