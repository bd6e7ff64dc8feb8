use netgraph_core::{CollectionError, Collector, ResourceRecord, ResourceType};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Counters describing one collection run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CollectionStats {
    pub total_records: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_region: BTreeMap<String, usize>,
    pub tasks_succeeded: usize,
    pub tasks_failed: usize,
    pub duration_ms: u64,
}

/// Everything a collection run produced: the records that were fetched,
/// plus a failure note per (region, type) task that did not fully succeed.
/// Partial tasks contribute to both.
#[derive(Debug, Default)]
pub struct AggregateResult {
    pub records: Vec<ResourceRecord>,
    pub failures: BTreeMap<String, String>,
    pub stats: CollectionStats,
}

/// Fans collection out across (region, resource type) pairs with bounded
/// concurrency. One task failing never aborts the others; its error lands
/// in the failure map and the run continues.
pub struct CollectorManager {
    collectors: HashMap<ResourceType, Arc<dyn Collector>>,
    concurrency_limit: usize,
    deadline: Duration,
}

impl CollectorManager {
    pub fn new(
        collectors: HashMap<ResourceType, Arc<dyn Collector>>,
        concurrency_limit: usize,
        deadline: Duration,
    ) -> Self {
        Self {
            collectors,
            concurrency_limit: concurrency_limit.max(1),
            deadline,
        }
    }

    fn task_key(region: &str, resource_type: &ResourceType) -> String {
        format!("{}/{}", region, resource_type)
    }

    pub async fn collect_all(
        &self,
        regions: &[String],
        resource_types: &[ResourceType],
    ) -> AggregateResult {
        let started = Instant::now();
        let deadline = self.deadline;
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut set: JoinSet<(String, netgraph_core::CollectionOutcome)> = JoinSet::new();
        let mut keys_by_task = HashMap::new();
        let mut result = AggregateResult::default();

        for region in regions {
            for resource_type in resource_types {
                let key = Self::task_key(region, resource_type);
                let Some(collector) = self.collectors.get(resource_type) else {
                    result
                        .failures
                        .insert(key, format!("no collector registered for {}", resource_type));
                    result.stats.tasks_failed += 1;
                    continue;
                };
                let collector = Arc::clone(collector);
                let permits = Arc::clone(&semaphore);
                let region = region.clone();
                let handle = set.spawn(async move {
                    // Semaphore is never closed while the set is alive.
                    let Ok(_permit) = permits.acquire().await else {
                        return (
                            Self::task_key(&region, &collector.resource_type()),
                            netgraph_core::CollectionOutcome::failed(
                                CollectionError::DeadlineExceeded,
                            ),
                        );
                    };
                    let key = Self::task_key(&region, &collector.resource_type());
                    // Work that has not started when the budget runs out is
                    // reported as missed, not silently dropped.
                    if started.elapsed() >= deadline {
                        return (
                            key,
                            netgraph_core::CollectionOutcome::failed(
                                CollectionError::DeadlineExceeded,
                            ),
                        );
                    }
                    let outcome = collector.collect(&region).await;
                    (key, outcome)
                });
                keys_by_task.insert(handle.id(), key);
            }
        }

        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((_id, (key, outcome))) => {
                    if let Some(error) = &outcome.error {
                        warn!(task = %key, error = %error, records = outcome.records.len(),
                              "collection task did not fully succeed");
                        result.failures.insert(key, error.to_string());
                        result.stats.tasks_failed += 1;
                    } else {
                        result.stats.tasks_succeeded += 1;
                    }
                    for record in &outcome.records {
                        *result
                            .stats
                            .by_type
                            .entry(record.resource_type.to_string())
                            .or_default() += 1;
                        *result.stats.by_region.entry(record.region.clone()).or_default() += 1;
                    }
                    result.records.extend(outcome.records);
                }
                Err(join_error) => {
                    let key = keys_by_task
                        .get(&join_error.id())
                        .cloned()
                        .unwrap_or_else(|| "unknown-task".to_string());
                    warn!(task = %key, error = %join_error, "collection task panicked");
                    result
                        .failures
                        .insert(key, format!("task aborted: {}", join_error));
                    result.stats.tasks_failed += 1;
                }
            }
        }

        result.stats.total_records = result.records.len();
        result.stats.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            records = result.stats.total_records,
            succeeded = result.stats.tasks_succeeded,
            failed = result.stats.tasks_failed,
            duration_ms = result.stats.duration_ms,
            "collection run finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use netgraph_core::{CollectionOutcome, ProviderError};

    struct StubCollector {
        resource_type: ResourceType,
        failing_region: Option<&'static str>,
    }

    #[async_trait]
    impl Collector for StubCollector {
        fn resource_type(&self) -> ResourceType {
            self.resource_type.clone()
        }

        fn service(&self) -> &'static str {
            "stub"
        }

        async fn collect(&self, region: &str) -> CollectionOutcome {
            if self.failing_region == Some(region) {
                return CollectionOutcome::failed(CollectionError::Fatal(ProviderError::Auth(
                    "denied".into(),
                )));
            }
            CollectionOutcome::ok(vec![ResourceRecord::new(
                format!("{}-{}", self.resource_type, region),
                self.resource_type.clone(),
                region,
            )])
        }
    }

    fn manager(failing_region: Option<&'static str>) -> CollectorManager {
        let mut collectors: HashMap<ResourceType, Arc<dyn Collector>> = HashMap::new();
        collectors.insert(
            ResourceType::Vpc,
            Arc::new(StubCollector {
                resource_type: ResourceType::Vpc,
                failing_region,
            }),
        );
        collectors.insert(
            ResourceType::Subnet,
            Arc::new(StubCollector {
                resource_type: ResourceType::Subnet,
                failing_region: None,
            }),
        );
        CollectorManager::new(collectors, 4, Duration::from_secs(30))
    }

    #[tokio::test]
    async fn all_tasks_succeed() {
        let regions = vec!["us-east-1".to_string(), "eu-west-1".to_string()];
        let types = vec![ResourceType::Vpc, ResourceType::Subnet];
        let result = manager(None).collect_all(&regions, &types).await;

        assert_eq!(result.records.len(), 4);
        assert!(result.failures.is_empty());
        assert_eq!(result.stats.tasks_succeeded, 4);
        assert_eq!(result.stats.by_region["us-east-1"], 2);
        assert_eq!(result.stats.by_type["vpc"], 2);
    }

    #[tokio::test]
    async fn one_failing_task_does_not_abort_the_rest() {
        let regions = vec!["us-east-1".to_string(), "eu-west-1".to_string()];
        let types = vec![ResourceType::Vpc, ResourceType::Subnet];
        let result = manager(Some("eu-west-1")).collect_all(&regions, &types).await;

        // Three of four tasks produced records; the failing one is named.
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.failures.len(), 1);
        assert!(result.failures.contains_key("eu-west-1/vpc"));
        assert_eq!(result.stats.tasks_failed, 1);
        assert_eq!(result.stats.tasks_succeeded, 3);
    }

    struct PanickingCollector;

    #[async_trait]
    impl Collector for PanickingCollector {
        fn resource_type(&self) -> ResourceType {
            ResourceType::Vpc
        }

        fn service(&self) -> &'static str {
            "stub"
        }

        async fn collect(&self, _region: &str) -> CollectionOutcome {
            panic!("collector bug");
        }
    }

    #[tokio::test]
    async fn panicking_task_is_attributed_to_its_key() {
        let mut collectors: HashMap<ResourceType, Arc<dyn Collector>> = HashMap::new();
        collectors.insert(ResourceType::Vpc, Arc::new(PanickingCollector));
        let manager = CollectorManager::new(collectors, 2, Duration::from_secs(30));
        let result = manager
            .collect_all(&["us-east-1".to_string()], &[ResourceType::Vpc])
            .await;

        assert!(result.records.is_empty());
        assert!(result.failures["us-east-1/vpc"].contains("task aborted"));
        assert_eq!(result.stats.tasks_failed, 1);
    }

    #[tokio::test]
    async fn unknown_type_is_reported_not_dropped() {
        let regions = vec!["us-east-1".to_string()];
        let types = vec![ResourceType::LoadBalancer];
        let result = manager(None).collect_all(&regions, &types).await;

        assert!(result.records.is_empty());
        assert!(result.failures["us-east-1/load_balancer"].contains("no collector registered"));
    }
}
