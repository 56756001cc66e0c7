use metrics_exporter_prometheus::PrometheusHandle;
use recovery_engine::config::EngineConfig;
use recovery_engine::engine::{
    AgencyRoster, BatchOrchestrator, ModelError, ScorecardModel,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wire the orchestrator with the built-in fitted scorecard and the
/// production agency roster.
pub(crate) fn build_orchestrator(
    config: EngineConfig,
) -> Result<Arc<BatchOrchestrator>, ModelError> {
    let orchestrator = BatchOrchestrator::new(
        Arc::new(ScorecardModel::fitted()),
        AgencyRoster::standard(),
        config,
    )?;
    Ok(Arc::new(orchestrator))
}
