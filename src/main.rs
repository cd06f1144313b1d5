use dotenv::dotenv;
use mosolo_backend::api::{self, webhooks::WebhookConfig, AppState};
use mosolo_backend::config::AppConfig;
use mosolo_backend::database::{init_pool, PgOrderStore, PoolConfig};
use mosolo_backend::logging::init_tracing;
use mosolo_backend::payments::GatewayFactory;
use mosolo_backend::services::{NotificationService, ReconciliationService};
use mosolo_backend::workers::ReconciliationSweepWorker;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

async fn shutdown_signal_with_notify(shutdown_tx: watch::Sender<bool>) {
    shutdown_signal().await;
    let _ = shutdown_tx.send(true);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "🚀 Starting Mosolo payments service"
    );

    info!("📊 Initializing database connection pool...");
    let db_pool = init_pool(
        &config.database.url,
        Some(PoolConfig {
            max_connections: config.database.max_connections,
            min_connections: config.database.min_connections,
            connection_timeout: Duration::from_secs(config.database.connection_timeout_secs),
            ..PoolConfig::default()
        }),
    )
    .await
    .map_err(|e| {
        error!("Failed to initialize database pool: {}", e);
        anyhow::anyhow!(e)
    })?;
    info!("✅ Database connection pool initialized");

    info!("💳 Initializing payment gateways...");
    let gateways = Arc::new(GatewayFactory::from_env().map_err(|e| {
        error!("Failed to initialize payment gateway factory: {}", e);
        anyhow::anyhow!(e)
    })?);

    let store = Arc::new(PgOrderStore::new(db_pool.clone()));
    let effects = Arc::new(NotificationService::new());
    let service = Arc::new(ReconciliationService::new(
        store.clone(),
        gateways,
        effects,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut sweep_handle = None;
    if config.reconciliation.enabled {
        let worker = ReconciliationSweepWorker::new(service.clone(), &config.reconciliation);
        sweep_handle = Some(tokio::spawn(worker.run(shutdown_rx)));
    } else {
        info!("Reconciliation sweep worker disabled (RECONCILE_SWEEP_ENABLED=false)");
    }

    let state = AppState {
        service,
        store,
        webhooks: Arc::new(WebhookConfig::from_env()),
        db_pool: Some(db_pool),
    };
    let app = api::router(state);
    info!("✅ Routes configured");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("❌ Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, "🚀 Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_with_notify(shutdown_tx.clone()))
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = sweep_handle {
        if let Err(e) = tokio::time::timeout(Duration::from_secs(5), handle).await {
            error!(error = %e, "Timed out waiting for sweep worker shutdown");
        }
    }

    info!("👋 Server shutdown complete");
    Ok(())
}
