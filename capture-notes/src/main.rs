use std::time::Duration;

use capture_notes::{app, config, retention, storage, telemetry, Result};
use tokio::{net::TcpListener, sync::watch};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::init()?;

    telemetry::setup_tracing(config.log_json);

    let store = storage::open(config).await?;

    if config.cleanup_on_startup {
        if let Err(error) = retention::sweep(store.as_ref(), config.cleanup_max_age_days).await {
            tracing::error!("startup retention sweep failed: {:?}", error);
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = config.cleanup_interval_hours.filter(|hours| *hours > 0).map(|hours| {
        retention::spawn_periodic(
            store.clone(),
            config.cleanup_max_age_days,
            Duration::from_secs(hours * 60 * 60),
            shutdown_rx,
        )
    });

    let app = telemetry::add_tracing_layer(app::create(store.clone()));

    let port = config.port;
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;

    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    shutdown_tx.send_replace(true);
    if let Some(sweeper) = sweeper {
        if let Err(error) = sweeper.await {
            tracing::error!("retention sweeper panicked: {:?}", error);
        }
    }

    store.close().await?;
    tracing::info!("store closed");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {:?}", error);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
