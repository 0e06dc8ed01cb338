use std::{collections::HashSet, fmt::Display};

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::{
    captures::{AudioId, CapturedImage, ImageId},
    media::base64_to_data_uri,
    storage::CaptureStore,
    Error, Result,
};

use super::{last_edited_label, CommitNote, CommitReport, FailedRow, Note, NoteDetail, NoteSummary, UpdateNote};

/// Cover for notes without photos.
pub const PLACEHOLDER_COVER: &str = "https://images.unsplash.com/photo-1557682250-33bd709cbe85?w=900&auto=format&fit=crop";

pub async fn load_note_with_media(store: &dyn CaptureStore, note_id: &str) -> Result<NoteDetail> {
    let note = store
        .get_note(note_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Note {note_id} not found")))?;

    let (images, audio) = tokio::try_join!(store.get_images_by_note_id(note_id), store.get_audio_by_note_id(note_id))?;

    Ok(NoteDetail { note, images, audio })
}

pub async fn load_all_notes_with_media<Tz>(
    store: &dyn CaptureStore,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<Vec<NoteSummary>>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let notes = store.get_all_notes().await?;

    let mut summaries = Vec::with_capacity(notes.len());
    for note in notes {
        let (images, audio) =
            tokio::try_join!(store.get_images_by_note_id(&note.id), store.get_audio_by_note_id(&note.id))?;
        summaries.push(summarize(NoteDetail { note, images, audio }, now, tz));
    }

    Ok(summaries)
}

pub fn summarize<Tz>(NoteDetail { note, images, audio }: NoteDetail, now: DateTime<Utc>, tz: &Tz) -> NoteSummary
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    NoteSummary {
        cover_image: cover_image(&images),
        photo_count: images.len(),
        audio_count: audio.len(),
        last_edited: last_edited_label(note.updated_at, now, tz),
        note,
        images,
        audio,
    }
}

/// Thumbnail of the earliest photo as a data URI, or [`PLACEHOLDER_COVER`].
pub fn cover_image(images: &[CapturedImage]) -> String {
    match images.first() {
        Some(image) => base64_to_data_uri(&image.thumbnail_data, &image.mime_type),
        None => PLACEHOLDER_COVER.into(),
    }
}

/// Saves the note, then attaches each requested draft on its own. A row that
/// fails to attach is reported and does not undo the others.
pub async fn commit_note(store: &dyn CaptureStore, input: CommitNote, now: DateTime<Utc>) -> Result<CommitReport> {
    let CommitNote {
        id,
        title,
        description,
        image_ids,
        audio_ids,
    } = input;

    let id = id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::now_v7().to_string());

    let created_at = match store.get_note(&id).await? {
        Some(existing) => existing.created_at,
        None => now,
    };

    let note = Note {
        id,
        title,
        description,
        created_at,
        updated_at: now.max(created_at),
    };
    store.save_note(note.clone()).await?;

    Ok(attach_media(store, note, image_ids, audio_ids).await)
}

pub async fn update_note(
    store: &dyn CaptureStore,
    note_id: &str,
    input: UpdateNote,
    now: DateTime<Utc>,
) -> Result<CommitReport> {
    let existing = store
        .get_note(note_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Note {note_id} not found")))?;

    let note = Note {
        title: input.title.unwrap_or(existing.title),
        description: input.description.unwrap_or(existing.description),
        updated_at: now.max(existing.created_at),
        ..existing
    };
    store.save_note(note.clone()).await?;

    Ok(attach_media(store, note, input.image_ids, input.audio_ids).await)
}

/// Removes the note and everything attached to it, returning what was removed.
pub async fn delete_note(store: &dyn CaptureStore, note_id: &str) -> Result<NoteDetail> {
    let detail = load_note_with_media(store, note_id).await?;

    store.delete_note(note_id).await?;

    Ok(detail)
}

async fn attach_media(
    store: &dyn CaptureStore,
    note: Note,
    image_ids: Vec<ImageId>,
    audio_ids: Vec<AudioId>,
) -> CommitReport {
    let mut report = CommitReport {
        note,
        committed_images: Vec::new(),
        committed_audio: Vec::new(),
        failed_images: Vec::new(),
        failed_audio: Vec::new(),
    };

    for id in unique(image_ids) {
        match store.mark_image_as_saved(id, &report.note.id).await {
            Ok(()) => report.committed_images.push(id),
            Err(error) => {
                tracing::warn!(id, note_id = %report.note.id, "image not committed: {:?}", error);
                report.failed_images.push(FailedRow {
                    id,
                    message: error.message(),
                });
            }
        }
    }

    for id in unique(audio_ids) {
        match store.mark_audio_as_saved(id, &report.note.id).await {
            Ok(()) => report.committed_audio.push(id),
            Err(error) => {
                tracing::warn!(id, note_id = %report.note.id, "audio not committed: {:?}", error);
                report.failed_audio.push(FailedRow {
                    id,
                    message: error.message(),
                });
            }
        }
    }

    tracing::debug!(
        note_id = %report.note.id,
        images = report.committed_images.len(),
        audio = report.committed_audio.len(),
        "note committed"
    );

    report
}

/// First occurrence wins, order kept.
fn unique(ids: Vec<i64>) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
