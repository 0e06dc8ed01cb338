//! Durable storage and lifecycle transitions for notes, images and audio.
//!
//! [`CaptureStore`] is the capability interface; [`SqliteStore`] and
//! [`MemoryStore`] implement it identically, the latter without durability.
//! Stores are constructed explicitly, initialized with [`CaptureStore::init`]
//! and shut down with [`CaptureStore::close`]; in between they are shared as
//! `Arc<dyn CaptureStore>`.

mod memory;
mod sqlite;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::{
    captures::{AudioId, AudioRecording, CapturedImage, ImageId, NewAudio, NewImage},
    config::{Config, StorageBackend},
    notes::Note,
    Result,
};

pub type Store = Arc<dyn CaptureStore>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub images_deleted: usize,
    pub audio_deleted: usize,
}

#[async_trait]
pub trait CaptureStore: Send + Sync {
    /// Opens the backend. Calling it on an open store is a no-op.
    async fn init(&self) -> Result<()>;

    /// Flushes and releases the backend; later calls fail with `NotInitialized`.
    async fn close(&self) -> Result<()>;

    async fn save_image(&self, image: NewImage) -> Result<ImageId>;

    /// Drafts, newest first.
    async fn get_unsaved_images(&self) -> Result<Vec<CapturedImage>>;

    /// Capture order, oldest first.
    async fn get_images_by_note_id(&self, note_id: &str) -> Result<Vec<CapturedImage>>;

    async fn mark_image_as_saved(&self, image_id: ImageId, note_id: &str) -> Result<()>;

    async fn delete_image(&self, image_id: ImageId) -> Result<()>;

    async fn save_audio(&self, audio: NewAudio) -> Result<AudioId>;

    async fn get_unsaved_audio(&self) -> Result<Vec<AudioRecording>>;

    async fn get_audio_by_note_id(&self, note_id: &str) -> Result<Vec<AudioRecording>>;

    async fn mark_audio_as_saved(&self, audio_id: AudioId, note_id: &str) -> Result<()>;

    async fn delete_audio(&self, audio_id: AudioId) -> Result<()>;

    /// Upsert by id; the caller sets `updated_at`.
    async fn save_note(&self, note: Note) -> Result<()>;

    async fn get_note(&self, note_id: &str) -> Result<Option<Note>>;

    /// Most recently updated first.
    async fn get_all_notes(&self) -> Result<Vec<Note>>;

    /// Removes the note together with every image and recording attached to it.
    async fn delete_note(&self, note_id: &str) -> Result<()>;

    /// Deletes drafts created strictly before `cutoff`. Committed rows are never touched.
    async fn delete_unsaved_before(&self, cutoff: DateTime<Utc>) -> Result<CleanupReport>;

    async fn cleanup_old_unsaved_items(&self, max_age_days: u32) -> Result<CleanupReport> {
        let cutoff = Utc::now() - Duration::days(i64::from(max_age_days));
        self.delete_unsaved_before(cutoff).await
    }
}

/// Builds the configured backend and initializes it.
pub async fn open(config: &Config) -> Result<Store> {
    let store: Store = match config.storage_backend {
        StorageBackend::Sqlite => Arc::new(SqliteStore::new(&config.database_url)),
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage, data will be lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    store.init().await?;

    tracing::info!(backend = ?config.storage_backend, "store initialized");

    Ok(store)
}
