use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use tokio::sync::RwLock;

use super::{CaptureStore, CleanupReport};
use crate::{
    captures::model::validate_target_note,
    captures::{AudioId, AudioRecording, CapturedImage, ImageId, NewAudio, NewImage},
    notes::Note,
    Error, Result,
};

#[derive(Default)]
struct Tables {
    /// Insertion order doubles as the tie-breaker for equal `updated_at`.
    notes: Vec<Note>,
    images: BTreeMap<ImageId, CapturedImage>,
    audio: BTreeMap<AudioId, AudioRecording>,
    last_image_id: ImageId,
    last_audio_id: AudioId,
}

impl Tables {
    fn has_note(&self, note_id: &str) -> bool {
        self.notes.iter().any(|n| n.id == note_id)
    }

    fn ensure_note_exists(&self, note_id: &str) -> Result<()> {
        if !self.has_note(note_id) {
            return Err(Error::not_found(format!("Note {note_id} not found")));
        }
        Ok(())
    }
}

/// Ephemeral store with the same contract as [`super::SqliteStore`].
/// Everything lives behind one lock, so each operation is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Option<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Match the precision the SQLite backend persists.
fn normalize(value: DateTime<Utc>) -> DateTime<Utc> {
    value.trunc_subsecs(6)
}

/// Draft -> committed transition over either media map.
fn commit_row<T>(
    rows: &mut BTreeMap<i64, T>,
    id: i64,
    note_id: &str,
    note_exists: bool,
    label: &str,
    state: impl Fn(&mut T) -> (&mut Option<String>, &mut bool),
) -> Result<()> {
    let row = rows
        .get_mut(&id)
        .ok_or_else(|| Error::not_found(format!("{label} {id} not found")))?;
    let (row_note, saved) = state(row);

    if *saved {
        if row_note.as_deref() == Some(note_id) {
            return Ok(());
        }
        return Err(Error::validation(format!("{label} {id} is already attached to another note")));
    }
    if !note_exists {
        return Err(Error::not_found(format!("Note {note_id} not found")));
    }

    *row_note = Some(note_id.to_owned());
    *saved = true;
    Ok(())
}

#[async_trait]
impl CaptureStore for MemoryStore {
    async fn init(&self) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.is_none() {
            *tables = Some(Tables::default());
            tracing::debug!("memory store opened");
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.tables.write().await.take().is_some() {
            tracing::debug!("memory store closed, contents discarded");
        }
        Ok(())
    }

    async fn save_image(&self, image: NewImage) -> Result<ImageId> {
        image.validate()?;

        let mut guard = self.tables.write().await;
        let tables = guard.as_mut().ok_or(Error::NotInitialized)?;
        if let Some(note_id) = &image.note_id {
            tables.ensure_note_exists(note_id)?;
        }

        tables.last_image_id += 1;
        let id = tables.last_image_id;
        let image = NewImage {
            created_at: normalize(image.created_at),
            ..image
        };
        tables.images.insert(id, image.with_id(id));

        tracing::debug!(id, "image saved");
        Ok(id)
    }

    async fn get_unsaved_images(&self) -> Result<Vec<CapturedImage>> {
        let guard = self.tables.read().await;
        let tables = guard.as_ref().ok_or(Error::NotInitialized)?;

        let mut images: Vec<_> = tables.images.values().filter(|i| !i.saved).cloned().collect();
        images.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(images)
    }

    async fn get_images_by_note_id(&self, note_id: &str) -> Result<Vec<CapturedImage>> {
        let guard = self.tables.read().await;
        let tables = guard.as_ref().ok_or(Error::NotInitialized)?;

        let mut images: Vec<_> = tables
            .images
            .values()
            .filter(|i| i.note_id.as_deref() == Some(note_id))
            .cloned()
            .collect();
        images.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(images)
    }

    async fn mark_image_as_saved(&self, image_id: ImageId, note_id: &str) -> Result<()> {
        validate_target_note(note_id)?;

        let mut guard = self.tables.write().await;
        let tables = guard.as_mut().ok_or(Error::NotInitialized)?;
        let note_exists = tables.has_note(note_id);

        commit_row(&mut tables.images, image_id, note_id, note_exists, "Image", |i| {
            (&mut i.note_id, &mut i.saved)
        })
    }

    async fn delete_image(&self, image_id: ImageId) -> Result<()> {
        let mut guard = self.tables.write().await;
        let tables = guard.as_mut().ok_or(Error::NotInitialized)?;
        tables.images.remove(&image_id);
        Ok(())
    }

    async fn save_audio(&self, audio: NewAudio) -> Result<AudioId> {
        audio.validate()?;

        let mut guard = self.tables.write().await;
        let tables = guard.as_mut().ok_or(Error::NotInitialized)?;
        if let Some(note_id) = &audio.note_id {
            tables.ensure_note_exists(note_id)?;
        }

        tables.last_audio_id += 1;
        let id = tables.last_audio_id;
        let audio = NewAudio {
            created_at: normalize(audio.created_at),
            ..audio
        };
        tables.audio.insert(id, audio.with_id(id));

        tracing::debug!(id, "audio saved");
        Ok(id)
    }

    async fn get_unsaved_audio(&self) -> Result<Vec<AudioRecording>> {
        let guard = self.tables.read().await;
        let tables = guard.as_ref().ok_or(Error::NotInitialized)?;

        let mut audio: Vec<_> = tables.audio.values().filter(|a| !a.saved).cloned().collect();
        audio.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(audio)
    }

    async fn get_audio_by_note_id(&self, note_id: &str) -> Result<Vec<AudioRecording>> {
        let guard = self.tables.read().await;
        let tables = guard.as_ref().ok_or(Error::NotInitialized)?;

        let mut audio: Vec<_> = tables
            .audio
            .values()
            .filter(|a| a.note_id.as_deref() == Some(note_id))
            .cloned()
            .collect();
        audio.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(audio)
    }

    async fn mark_audio_as_saved(&self, audio_id: AudioId, note_id: &str) -> Result<()> {
        validate_target_note(note_id)?;

        let mut guard = self.tables.write().await;
        let tables = guard.as_mut().ok_or(Error::NotInitialized)?;
        let note_exists = tables.has_note(note_id);

        commit_row(&mut tables.audio, audio_id, note_id, note_exists, "Audio recording", |a| {
            (&mut a.note_id, &mut a.saved)
        })
    }

    async fn delete_audio(&self, audio_id: AudioId) -> Result<()> {
        let mut guard = self.tables.write().await;
        let tables = guard.as_mut().ok_or(Error::NotInitialized)?;
        tables.audio.remove(&audio_id);
        Ok(())
    }

    async fn save_note(&self, note: Note) -> Result<()> {
        note.validate()?;

        let mut guard = self.tables.write().await;
        let tables = guard.as_mut().ok_or(Error::NotInitialized)?;
        let note = Note {
            created_at: normalize(note.created_at),
            updated_at: normalize(note.updated_at),
            ..note
        };

        match tables.notes.iter_mut().find(|n| n.id == note.id) {
            Some(existing) => *existing = note,
            None => tables.notes.push(note),
        }
        Ok(())
    }

    async fn get_note(&self, note_id: &str) -> Result<Option<Note>> {
        let guard = self.tables.read().await;
        let tables = guard.as_ref().ok_or(Error::NotInitialized)?;
        Ok(tables.notes.iter().find(|n| n.id == note_id).cloned())
    }

    async fn get_all_notes(&self) -> Result<Vec<Note>> {
        let guard = self.tables.read().await;
        let tables = guard.as_ref().ok_or(Error::NotInitialized)?;

        let mut notes = tables.notes.clone();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(notes)
    }

    async fn delete_note(&self, note_id: &str) -> Result<()> {
        let mut guard = self.tables.write().await;
        let tables = guard.as_mut().ok_or(Error::NotInitialized)?;

        tables.notes.retain(|n| n.id != note_id);
        tables.images.retain(|_, i| i.note_id.as_deref() != Some(note_id));
        tables.audio.retain(|_, a| a.note_id.as_deref() != Some(note_id));
        Ok(())
    }

    async fn delete_unsaved_before(&self, cutoff: DateTime<Utc>) -> Result<CleanupReport> {
        let mut guard = self.tables.write().await;
        let tables = guard.as_mut().ok_or(Error::NotInitialized)?;
        let cutoff = normalize(cutoff);

        let images_before = tables.images.len();
        tables.images.retain(|_, i| i.saved || i.created_at >= cutoff);
        let audio_before = tables.audio.len();
        tables.audio.retain(|_, a| a.saved || a.created_at >= cutoff);

        Ok(CleanupReport {
            images_deleted: images_before - tables.images.len(),
            audio_deleted: audio_before - tables.audio.len(),
        })
    }
}
