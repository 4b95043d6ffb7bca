//! tgrelay entry point: environment, logging, service wiring, serve.

use std::sync::Arc;

use {
    tracing::info,
    tracing_subscriber::EnvFilter,
};

use {
    tgrelay_backend::{BridgeConfig, BridgeFactory},
    tgrelay_gateway::{AppState, GatewayConfig, serve},
    tgrelay_products::DirectSearch,
    tgrelay_sessions::SessionRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = GatewayConfig::from_env()?;

    let factory = Arc::new(BridgeFactory::new(BridgeConfig::new(
        config.bridge_url.clone(),
        config.app_id,
        config.app_secret.clone(),
    )));
    let registry = Arc::new(SessionRegistry::new(factory));
    let state = AppState::new(registry, Arc::new(DirectSearch::new()));

    serve(config.bind, state, shutdown_signal()).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            // Without a signal handler there is no graceful path; keep serving.
            info!(error = %e, "shutdown signal unavailable, serving until killed");
            std::future::pending::<()>().await;
        },
    }
}
