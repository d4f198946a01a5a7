use crate::cli::ServeArgs;
use crate::infra::{build_verifier, AppState};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use questionnaire_hub::clock::{Clock, SystemClock};
use questionnaire_hub::config::AppConfig;
use questionnaire_hub::error::AppError;
use questionnaire_hub::repository::Repositories;
use questionnaire_hub::{telemetry, Hub};
use std::sync::atomic::{AtomicBool, Ordering};
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let verifier = build_verifier(&config.auth, clock.clone());
    let hub = Hub::new(Repositories::in_memory(), clock);

    let app = with_operational_routes(hub.router(verifier), config.server.base_path.as_deref())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        base_path = config.server.base_path.as_deref().unwrap_or("/"),
        "questionnaire hub ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
