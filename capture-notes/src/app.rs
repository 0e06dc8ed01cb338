use axum::{
    extract::State,
    middleware::{self},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::{
    captures, config,
    errors::{self, on_error},
    notes, retention,
    state::AppState,
    storage::Store,
};

pub fn create(store: Store) -> Router {
    let state = AppState { store };

    Router::new()
        .route("/__version__", get(version))
        .route("/__heartbeat__", get(heartbeat))
        .route("/__lbheartbeat__", get(lbheartbeat))
        .with_state(state.clone())
        .merge(captures::router(state.clone()))
        .merge(notes::router(state.clone()))
        .merge(retention::router(state))
        .layer(middleware::from_fn(on_error))
}

async fn version() -> impl IntoResponse {
    let config = &config();
    Json(json!({
        "source" : config.source,
        "version": config.version,
        "commit" : config.git_commit,
        "build"  : config.pipeline_id
    }))
}

/// Healthy when the store answers a point lookup.
async fn heartbeat(State(store): State<Store>) -> errors::Result<impl IntoResponse> {
    store.get_note("__heartbeat__").await?;

    Ok(Json(json!({
        "status" : "ok",
        "backend": config().storage_backend,
    })))
}

async fn lbheartbeat() -> impl IntoResponse {
    ""
}
