use netgraph_ai::{AnomalyDetector, DetectionPhase, HttpModelClient};
use netgraph_collect::{
    build_collectors, ApiRateLimiter, CollectionStats, CollectorContext, CollectorManager,
    RetryPolicy,
};
use netgraph_core::{
    AnomalyReport, Diagnostic, DiscoveryConfig, ModelProvider, NetGraphError, ProviderClient,
    Result,
};
use netgraph_graph::{build_graph, AnalysisSummary, GraphAnalyzer, GraphExport};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Everything one discovery run produced.
#[derive(Debug, Serialize)]
pub struct DiscoveryOutput {
    pub run_id: Uuid,
    pub graph: GraphExport,
    pub analysis: AnalysisSummary,
    pub report: AnomalyReport,
    pub phase: DetectionPhase,
    pub failures: BTreeMap<String, String>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: CollectionStats,
}

/// Run the full discovery pipeline: collect, build, analyze, detect.
///
/// Collection failures for individual (region, type) tasks degrade the
/// output rather than aborting it; only an invalid configuration fails the
/// run outright. When model analysis is enabled and no provider is
/// injected, an HTTP client is built from the configuration.
pub async fn run_discovery(
    config: &DiscoveryConfig,
    provider: Arc<dyn ProviderClient>,
    model: Option<Arc<dyn ModelProvider>>,
) -> Result<DiscoveryOutput> {
    config.validate()?;
    let run_id = Uuid::new_v4();
    let span = info_span!("discovery", %run_id);

    async move {
        info!(
            regions = config.regions.len(),
            resource_types = config.resource_types.len(),
            ai_enabled = config.ai_enabled,
            "starting discovery run"
        );

        let limiter = Arc::new(ApiRateLimiter::new(&config.rate_limit, config.retry.max_delay()));
        let retry = Arc::new(RetryPolicy::new(config.retry.clone()));
        let ctx = Arc::new(CollectorContext {
            provider,
            limiter,
            retry,
            deadline: tokio::time::Instant::now() + config.deadline(),
        });
        let manager = CollectorManager::new(
            build_collectors(ctx),
            config.concurrency_limit,
            config.deadline(),
        );
        let collected = manager
            .collect_all(&config.regions, &config.resource_types)
            .await;

        let (graph, mut diagnostics) = build_graph(collected.records);
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            diagnostics = diagnostics.len(),
            "topology graph built"
        );

        let analysis = GraphAnalyzer::new(&graph).summarize(10);

        let model = resolve_model(config, model)?;
        let detector = AnomalyDetector::new(model, config.max_digest_chars);
        let detection = detector.detect(&graph).await;
        diagnostics.extend(detection.diagnostics);

        info!(
            anomalies = detection.report.total,
            phase = ?detection.phase,
            failures = collected.failures.len(),
            "discovery run complete"
        );

        Ok(DiscoveryOutput {
            run_id,
            graph: graph.export(),
            analysis,
            report: detection.report,
            phase: detection.phase,
            failures: collected.failures,
            diagnostics,
            stats: collected.stats,
        })
    }
    .instrument(span)
    .await
}

fn resolve_model(
    config: &DiscoveryConfig,
    injected: Option<Arc<dyn ModelProvider>>,
) -> Result<Option<Arc<dyn ModelProvider>>> {
    if !config.ai_enabled {
        return Ok(None);
    }
    if let Some(model) = injected {
        return Ok(Some(model));
    }
    let model_config = config
        .model
        .clone()
        .ok_or_else(|| NetGraphError::Config("ai_enabled requires a model configuration".into()))?;
    let client = HttpModelClient::new(model_config)
        .map_err(|e| NetGraphError::Config(e.to_string()))?;
    Ok(Some(Arc::new(client)))
}
