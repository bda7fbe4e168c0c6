//! Render queue API server entry point.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use packshot_api::{create_router, ApiConfig, AppState};
use packshot_store::{RetentionConfig, RetentionSweeper};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    init_tracing();

    let config = ApiConfig::from_env();
    info!(
        host = %config.host,
        port = config.port,
        environment = %config.environment,
        "Starting render queue API server"
    );

    let metrics_handle = if std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
    {
        info!("Prometheus metrics enabled at /metrics");
        Some(packshot_api::metrics::init_metrics())
    } else {
        None
    };

    let state = AppState::new(config.clone())?;

    let retention = RetentionConfig::from_env();
    if retention.enabled {
        let sweeper = RetentionSweeper::new(Arc::clone(&state.store), retention);
        tokio::spawn(async move { sweeper.run().await });
    }

    let app = create_router(state, metrics_handle);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("packshot=info,tower_http=info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("Failed to install shutdown signal handler");
    }
    info!("Shutdown signal received");
}
