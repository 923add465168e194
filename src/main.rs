use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use catalog_api::{
    app::{self, AppState, HttpOptions},
    auth::TokenVerifier,
    config::AppConfig,
    database::{DatabaseManager, ProductRepository},
    flags::{FlagPoller, FlagSnapshot},
    middleware::RoleGate,
    services::CatalogService,
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let log_level = telemetry::init(config.log_level);
    tracing::info!("Starting Catalog API in {:?} mode", config.environment);

    let verifier = TokenVerifier::new(&config.security.jwt_secret, config.security.jwt_algorithm)
        .context("token verifier")?;
    let gate = RoleGate::new(verifier, config.security.admin_role.as_str());

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("database connection")?;
    let store = Arc::new(ProductRepository::new(pool.clone()));

    let flags = FlagPoller::start(
        &config.flags,
        FlagSnapshot::new(config.log_level),
        Some(log_level),
    )
    .await;

    let state = AppState {
        catalog: CatalogService::new(store),
        flags: flags.handle(),
    };
    let options = HttpOptions {
        request_timeout: Duration::from_secs(config.server.request_timeout_secs),
        cors_origins: config.server.cors_origins.clone(),
    };
    let app = app::router(state, gate, options);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("Catalog API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server")?;

    flags.shutdown();
    pool.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
