use crate::cli::ServeArgs;
use crate::infra::{build_orchestrator, AppState};
use crate::routes::with_recovery_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use recovery_engine::config::AppConfig;
use recovery_engine::error::AppError;
use recovery_engine::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(config.environment, &config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let orchestrator = build_orchestrator(config.engine.clone()).map_err(AppError::Model)?;

    let app = with_recovery_routes(orchestrator)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "recovery prediction service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
