//! reward-ledger server entry point.
//!
//! Starts the Axum HTTP server and the price ingestion task.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use reward_ledger::api;
use reward_ledger::app_state::AppState;
use reward_ledger::config::LedgerConfig;
use reward_ledger::persistence::{InMemoryStore, PostgresStore, PriceSource, RewardStore};
use reward_ledger::service::spawn_price_ingestion;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = LedgerConfig::from_env().context("invalid LISTEN_ADDR")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting reward-ledger");

    // Build persistence layer
    let (store, prices): (Arc<dyn RewardStore>, Arc<dyn PriceSource>) =
        if config.persistence_enabled {
            let pg = Arc::new(
                PostgresStore::connect(&config)
                    .await
                    .context("connecting to database")?,
            );
            pg.migrate().await.context("running migrations")?;
            tracing::info!("using PostgreSQL persistence");
            (Arc::clone(&pg) as Arc<dyn RewardStore>, pg as Arc<dyn PriceSource>)
        } else {
            let memory = Arc::new(InMemoryStore::new());
            tracing::warn!("persistence disabled, state is kept in memory only");
            (
                Arc::clone(&memory) as Arc<dyn RewardStore>,
                memory as Arc<dyn PriceSource>,
            )
        };

    // Build application state
    let app_state = AppState::new(store, prices);

    // Start price ingestion
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ingestion = config.price_fetch_enabled.then(|| {
        spawn_price_ingestion(
            Arc::clone(&app_state.price_service),
            config.price_fetch_interval(),
            shutdown_rx,
        )
    });

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = ingestion
        && let Err(e) = handle.await
    {
        tracing::error!(error = %e, "price ingestion task failed");
    }

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
