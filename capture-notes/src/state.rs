use axum::extract::FromRef;

use crate::storage::Store;

#[derive(FromRef, Clone)]
pub struct AppState {
    pub store: Store,
}
