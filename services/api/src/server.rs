use crate::cli::ServeArgs;
use crate::infra::{build_engine, load_scorer, AppState};
use crate::routes::router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use bullpen::config::AppConfig;
use bullpen::error::AppError;
use bullpen::telemetry;
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

    telemetry::init(&config.telemetry)?;

    let scorer = load_scorer(&config.model.artifact_path, config.model.horizon_batters)?;
    let engine = Arc::new(build_engine(&config, scorer)?);

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        engine: engine.clone(),
        model_path: Arc::new(config.model.artifact_path.clone()),
    };

    let app = router()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        scorer = %engine.scorer().name(),
        horizon_batters = engine.horizon_batters(),
        "bullpen recommender ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
