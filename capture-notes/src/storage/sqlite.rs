use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio::sync::RwLock;

use super::{CaptureStore, CleanupReport};
use crate::{
    captures::{AudioId, AudioRecording, CapturedImage, ImageId, NewAudio, NewImage},
    captures::model::validate_target_note,
    db::{self, DB},
    notes::Note,
    Error, Result,
};

const IMAGE_COLUMNS: &str =
    "id, note_id, image_data, thumbnail_data, file_name, mime_type, width, height, created_at, saved";
const AUDIO_COLUMNS: &str = "id, note_id, audio_data, file_name, mime_type, duration, created_at, saved";
const NOTE_COLUMNS: &str = "id, title, description, created_at, updated_at";

#[derive(Debug, Clone)]
enum Location {
    File(String),
    Memory,
}

/// SQLite backed store. All statements run on the connection's own thread,
/// one at a time, so writes never interleave.
pub struct SqliteStore {
    location: Location,
    conn: RwLock<Option<DB>>,
}

impl SqliteStore {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            location: Location::File(path.into()),
            conn: RwLock::new(None),
        }
    }

    /// Same schema and semantics, but nothing survives `close`.
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            conn: RwLock::new(None),
        }
    }

    async fn db(&self) -> Result<DB> {
        self.conn.read().await.clone().ok_or(Error::NotInitialized)
    }
}

#[derive(Clone, Copy)]
enum Media {
    Image,
    Audio,
}

impl Media {
    fn table(self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Audio => "audio",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Audio => "Audio recording",
        }
    }
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn get_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

impl<'a> TryFrom<&Row<'a>> for CapturedImage {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'a>) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.get(0)?,
            note_id: row.get(1)?,
            image_data: row.get(2)?,
            thumbnail_data: row.get(3)?,
            file_name: row.get(4)?,
            mime_type: row.get(5)?,
            width: row.get(6)?,
            height: row.get(7)?,
            created_at: get_timestamp(row, 8)?,
            saved: row.get(9)?,
        })
    }
}

impl<'a> TryFrom<&Row<'a>> for AudioRecording {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'a>) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.get(0)?,
            note_id: row.get(1)?,
            audio_data: row.get(2)?,
            file_name: row.get(3)?,
            mime_type: row.get(4)?,
            duration: row.get(5)?,
            created_at: get_timestamp(row, 6)?,
            saved: row.get(7)?,
        })
    }
}

impl<'a> TryFrom<&Row<'a>> for Note {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'a>) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            created_at: get_timestamp(row, 3)?,
            updated_at: get_timestamp(row, 4)?,
        })
    }
}

fn ensure_note_exists(conn: &rusqlite::Connection, note_id: &str) -> std::result::Result<(), tokio_rusqlite::Error> {
    let exists = conn
        .query_row("SELECT 1 FROM notes WHERE id = ?", params![note_id], |_| Ok(()))
        .optional()?
        .is_some();

    if !exists {
        return Err(Error::not_found(format!("Note {note_id} not found")).into());
    }
    Ok(())
}

/// The single draft -> committed transition, shared by both media tables.
fn mark_as_saved(
    conn: &mut rusqlite::Connection,
    media: Media,
    id: i64,
    note_id: &str,
) -> std::result::Result<(), tokio_rusqlite::Error> {
    let tx = conn.transaction()?;

    let current: Option<(Option<String>, bool)> = tx
        .query_row(
            &format!("SELECT note_id, saved FROM {} WHERE id = ?", media.table()),
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((current_note, saved)) = current else {
        return Err(Error::not_found(format!("{} {id} not found", media.label())).into());
    };

    if saved {
        if current_note.as_deref() == Some(note_id) {
            return Ok(());
        }
        return Err(Error::validation(format!("{} {id} is already attached to another note", media.label())).into());
    }

    ensure_note_exists(&tx, note_id)?;

    tx.execute(
        &format!("UPDATE {} SET saved = 1, note_id = ? WHERE id = ?", media.table()),
        params![note_id, id],
    )?;

    tx.commit()?;
    Ok(())
}

#[async_trait]
impl CaptureStore for SqliteStore {
    async fn init(&self) -> Result<()> {
        let mut conn = self.conn.write().await;
        if conn.is_some() {
            return Ok(());
        }

        let db = match &self.location {
            Location::File(path) => db::init_db(path).await?,
            Location::Memory => db::init_memory_db().await?,
        };
        *conn = Some(db);

        tracing::debug!(location = ?self.location, "sqlite store opened");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let Some(db) = self.conn.write().await.take() else {
            return Ok(());
        };

        db.call(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
            Ok(())
        })
        .await?;

        db.close().await.map_err(db::Error::from)?;

        tracing::debug!(location = ?self.location, "sqlite store closed");
        Ok(())
    }

    async fn save_image(&self, image: NewImage) -> Result<ImageId> {
        image.validate()?;

        let id = self
            .db()
            .await?
            .call(move |conn| {
                if let Some(note_id) = &image.note_id {
                    ensure_note_exists(conn, note_id)?;
                }

                let id: ImageId = conn.query_row(
                    r#"INSERT INTO images (note_id, image_data, thumbnail_data, file_name, mime_type, width, height, created_at, saved)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    RETURNING id"#,
                    params![
                        image.note_id,
                        image.image_data,
                        image.thumbnail_data,
                        image.file_name,
                        image.mime_type,
                        image.width,
                        image.height,
                        timestamp(&image.created_at),
                        image.saved,
                    ],
                    |row| row.get(0),
                )?;
                Ok(id)
            })
            .await?;

        tracing::debug!(id, "image saved");
        Ok(id)
    }

    async fn get_unsaved_images(&self) -> Result<Vec<CapturedImage>> {
        let images = self
            .db()
            .await?
            .call(|conn| {
                let images = conn
                    .prepare(&format!(
                        "SELECT {IMAGE_COLUMNS} FROM images WHERE saved = 0 ORDER BY created_at DESC, id ASC"
                    ))?
                    .query_map([], |row| CapturedImage::try_from(row))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(images)
            })
            .await?;
        Ok(images)
    }

    async fn get_images_by_note_id(&self, note_id: &str) -> Result<Vec<CapturedImage>> {
        let note_id = note_id.to_owned();
        let images = self
            .db()
            .await?
            .call(move |conn| {
                let images = conn
                    .prepare(&format!(
                        "SELECT {IMAGE_COLUMNS} FROM images WHERE note_id = ? ORDER BY created_at ASC, id ASC"
                    ))?
                    .query_map(params![note_id], |row| CapturedImage::try_from(row))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(images)
            })
            .await?;
        Ok(images)
    }

    async fn mark_image_as_saved(&self, image_id: ImageId, note_id: &str) -> Result<()> {
        validate_target_note(note_id)?;
        let note_id = note_id.to_owned();

        self.db()
            .await?
            .call(move |conn| mark_as_saved(conn, Media::Image, image_id, &note_id))
            .await?;
        Ok(())
    }

    async fn delete_image(&self, image_id: ImageId) -> Result<()> {
        self.db()
            .await?
            .call(move |conn| {
                conn.execute("DELETE FROM images WHERE id = ?", params![image_id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn save_audio(&self, audio: NewAudio) -> Result<AudioId> {
        audio.validate()?;

        let id = self
            .db()
            .await?
            .call(move |conn| {
                if let Some(note_id) = &audio.note_id {
                    ensure_note_exists(conn, note_id)?;
                }

                let id: AudioId = conn.query_row(
                    r#"INSERT INTO audio (note_id, audio_data, file_name, mime_type, duration, created_at, saved)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    RETURNING id"#,
                    params![
                        audio.note_id,
                        audio.audio_data,
                        audio.file_name,
                        audio.mime_type,
                        audio.duration,
                        timestamp(&audio.created_at),
                        audio.saved,
                    ],
                    |row| row.get(0),
                )?;
                Ok(id)
            })
            .await?;

        tracing::debug!(id, "audio saved");
        Ok(id)
    }

    async fn get_unsaved_audio(&self) -> Result<Vec<AudioRecording>> {
        let audio = self
            .db()
            .await?
            .call(|conn| {
                let audio = conn
                    .prepare(&format!(
                        "SELECT {AUDIO_COLUMNS} FROM audio WHERE saved = 0 ORDER BY created_at DESC, id ASC"
                    ))?
                    .query_map([], |row| AudioRecording::try_from(row))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(audio)
            })
            .await?;
        Ok(audio)
    }

    async fn get_audio_by_note_id(&self, note_id: &str) -> Result<Vec<AudioRecording>> {
        let note_id = note_id.to_owned();
        let audio = self
            .db()
            .await?
            .call(move |conn| {
                let audio = conn
                    .prepare(&format!(
                        "SELECT {AUDIO_COLUMNS} FROM audio WHERE note_id = ? ORDER BY created_at ASC, id ASC"
                    ))?
                    .query_map(params![note_id], |row| AudioRecording::try_from(row))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(audio)
            })
            .await?;
        Ok(audio)
    }

    async fn mark_audio_as_saved(&self, audio_id: AudioId, note_id: &str) -> Result<()> {
        validate_target_note(note_id)?;
        let note_id = note_id.to_owned();

        self.db()
            .await?
            .call(move |conn| mark_as_saved(conn, Media::Audio, audio_id, &note_id))
            .await?;
        Ok(())
    }

    async fn delete_audio(&self, audio_id: AudioId) -> Result<()> {
        self.db()
            .await?
            .call(move |conn| {
                conn.execute("DELETE FROM audio WHERE id = ?", params![audio_id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn save_note(&self, note: Note) -> Result<()> {
        note.validate()?;

        self.db()
            .await?
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO notes (id, title, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?)
                    ON CONFLICT (id) DO UPDATE SET
                        title = excluded.title,
                        description = excluded.description,
                        created_at = excluded.created_at,
                        updated_at = excluded.updated_at"#,
                    params![
                        note.id,
                        note.title,
                        note.description,
                        timestamp(&note.created_at),
                        timestamp(&note.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn get_note(&self, note_id: &str) -> Result<Option<Note>> {
        let note_id = note_id.to_owned();
        let note = self
            .db()
            .await?
            .call(move |conn| {
                let note = conn
                    .query_row(
                        &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?"),
                        params![note_id],
                        |row| Note::try_from(row),
                    )
                    .optional()?;
                Ok(note)
            })
            .await?;
        Ok(note)
    }

    async fn get_all_notes(&self) -> Result<Vec<Note>> {
        let notes = self
            .db()
            .await?
            .call(|conn| {
                let notes = conn
                    .prepare(&format!(
                        "SELECT {NOTE_COLUMNS} FROM notes ORDER BY updated_at DESC, rowid ASC"
                    ))?
                    .query_map([], |row| Note::try_from(row))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(notes)
            })
            .await?;
        Ok(notes)
    }

    async fn delete_note(&self, note_id: &str) -> Result<()> {
        let note_id = note_id.to_owned();
        self.db()
            .await?
            .call(move |conn| {
                // media rows follow through ON DELETE CASCADE
                conn.execute("DELETE FROM notes WHERE id = ?", params![note_id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn delete_unsaved_before(&self, cutoff: DateTime<Utc>) -> Result<CleanupReport> {
        let cutoff = timestamp(&cutoff);
        let report = self
            .db()
            .await?
            .call(move |conn| {
                let tx = conn.transaction()?;
                let images_deleted =
                    tx.execute("DELETE FROM images WHERE saved = 0 AND created_at < ?", params![cutoff])?;
                let audio_deleted =
                    tx.execute("DELETE FROM audio WHERE saved = 0 AND created_at < ?", params![cutoff])?;
                tx.commit()?;
                Ok(CleanupReport {
                    images_deleted,
                    audio_deleted,
                })
            })
            .await?;
        Ok(report)
    }
}
