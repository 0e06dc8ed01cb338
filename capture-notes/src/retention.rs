//! Retention sweep for abandoned drafts.

use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::post, Router};
use serde::Deserialize;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    config,
    extract::{Json, Query},
    state::AppState,
    storage::{CaptureStore, CleanupReport, Store},
    Result,
};

/// Deletes drafts older than `max_age_days`. Committed media is never touched.
pub async fn sweep(store: &dyn CaptureStore, max_age_days: u32) -> Result<CleanupReport> {
    let report = store.cleanup_old_unsaved_items(max_age_days).await?;

    tracing::info!(
        max_age_days,
        images = report.images_deleted,
        audio = report.audio_deleted,
        "retention sweep finished"
    );

    Ok(report)
}

/// Sweeps every `every` until `shutdown` flips. A sweep in progress always
/// runs to completion; failures are logged and retried on the next tick.
pub fn spawn_periodic(
    store: Store,
    max_age_days: u32,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // first tick fires immediately; the startup sweep covers it
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(error) = sweep(store.as_ref(), max_age_days).await {
                        tracing::error!("retention sweep failed: {:?}", error);
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        tracing::debug!("retention sweeper stopped");
    })
}

#[derive(Debug, Default, Deserialize)]
struct CleanupParams {
    max_age_days: Option<u32>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/maintenance/cleanup", post(cleanup))
        .with_state(state)
}

async fn cleanup(State(store): State<Store>, Query(params): Query<CleanupParams>) -> impl IntoResponse {
    let max_age_days = params.max_age_days.unwrap_or(config().cleanup_max_age_days);
    sweep(store.as_ref(), max_age_days).await.map(Json)
}
