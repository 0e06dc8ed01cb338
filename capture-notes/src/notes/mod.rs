mod handlers;
mod labels;
mod model;
mod routes;

use axum::Router;

pub use handlers::{
    commit_note, cover_image, delete_note, load_all_notes_with_media, load_note_with_media, summarize, update_note,
    PLACEHOLDER_COVER,
};
pub use labels::last_edited_label;
pub use model::*;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new().merge(routes::router(state))
}
