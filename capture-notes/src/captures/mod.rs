mod handlers;
pub mod model;
mod routes;

use axum::Router;

pub use handlers::{capture_audio, capture_image, list_drafts};
pub use model::{
    AudioId, AudioRecording, CaptureAudio, CaptureCreated, CaptureImage, CapturedImage, Drafts, ImageId, NewAudio,
    NewImage,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new().merge(routes::router(state))
}
