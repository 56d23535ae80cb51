use crate::cli::ServeArgs;
use crate::infra::{load_dataset, open_store, seed_options, AppState, SeedOverrides};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use learnseed::config::AppConfig;
use learnseed::error::AppError;
use learnseed::service::CatalogService;
use learnseed::telemetry;
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
    SeedOverrides {
        store: args.store.take(),
        dataset: args.dataset.take(),
    }
    .apply(&mut config.seed);

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(open_store(&config.seed.store_path)?);
    let catalog_service = Arc::new(CatalogService::new(store, config.seed.creator.clone()));

    if args.seed {
        let dataset = load_dataset(config.seed.dataset_dir.as_deref())?;
        let report = catalog_service.seed(&dataset, &seed_options(&config.seed, false, false))?;
        info!(
            inserted = report.inserted(),
            system_default = %report.system_default,
            "startup seed committed"
        );
    }

    let app = with_operational_routes(catalog_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "learning catalog service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
