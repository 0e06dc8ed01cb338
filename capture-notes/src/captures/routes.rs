use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;

use crate::{
    config,
    extract::{Json, Path},
    state::AppState,
    storage::Store,
};

use super::{handlers, AudioId, CaptureAudio, CaptureImage, ImageId};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/captures", get(list_drafts))
        .route("/api/v1/captures/images", post(capture_image))
        .route("/api/v1/captures/images/{id}", delete(delete_image))
        .route("/api/v1/captures/audio", post(capture_audio))
        .route("/api/v1/captures/audio/{id}", delete(delete_audio))
        .with_state(state)
}

async fn list_drafts(State(store): State<Store>) -> impl IntoResponse {
    handlers::list_drafts(store.as_ref()).await.map(Json)
}

async fn capture_image(State(store): State<Store>, Json(args): Json<CaptureImage>) -> impl IntoResponse {
    let max_width = config().thumbnail_max_width;
    handlers::capture_image(store.as_ref(), args, max_width, Utc::now())
        .await
        .map(|r| (StatusCode::CREATED, Json(r)))
}

async fn capture_audio(State(store): State<Store>, Json(args): Json<CaptureAudio>) -> impl IntoResponse {
    handlers::capture_audio(store.as_ref(), args, Utc::now())
        .await
        .map(|r| (StatusCode::CREATED, Json(r)))
}

async fn delete_image(State(store): State<Store>, Path(id): Path<ImageId>) -> impl IntoResponse {
    store.delete_image(id).await.map(|_| StatusCode::NO_CONTENT)
}

async fn delete_audio(State(store): State<Store>, Path(id): Path<AudioId>) -> impl IntoResponse {
    store.delete_audio(id).await.map(|_| StatusCode::NO_CONTENT)
}
