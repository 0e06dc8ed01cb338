use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use chrono::{Local, Utc};

use crate::{
    extract::{Json, Path},
    state::AppState,
    storage::Store,
};

use super::{handlers, CommitNote, FindNotesResponse, UpdateNote};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/notes", get(find_notes).post(create_note))
        .route(
            "/api/v1/notes/{note_id}",
            get(get_note).patch(update_note).delete(delete_note),
        )
        .with_state(state)
}

async fn find_notes(State(store): State<Store>) -> impl IntoResponse {
    handlers::load_all_notes_with_media(store.as_ref(), Utc::now(), &Local)
        .await
        .map(|results| Json(FindNotesResponse { results }))
}

async fn create_note(State(store): State<Store>, Json(args): Json<CommitNote>) -> impl IntoResponse {
    handlers::commit_note(store.as_ref(), args, Utc::now())
        .await
        .map(|r| (StatusCode::CREATED, Json(r)))
}

async fn get_note(State(store): State<Store>, Path(note_id): Path<String>) -> impl IntoResponse {
    handlers::load_note_with_media(store.as_ref(), &note_id).await.map(Json)
}

async fn update_note(
    State(store): State<Store>,
    Path(note_id): Path<String>,
    Json(args): Json<UpdateNote>,
) -> impl IntoResponse {
    handlers::update_note(store.as_ref(), &note_id, args, Utc::now())
        .await
        .map(Json)
}

async fn delete_note(State(store): State<Store>, Path(note_id): Path<String>) -> impl IntoResponse {
    handlers::delete_note(store.as_ref(), &note_id).await.map(Json)
}
