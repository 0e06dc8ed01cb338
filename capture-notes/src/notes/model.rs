use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    captures::{AudioId, AudioRecording, CapturedImage, ImageId},
    Error, Result,
};

pub type NoteId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::validation("Note id must not be empty"));
        }
        if self.title.trim().is_empty() {
            return Err(Error::validation("Note title must not be empty"));
        }
        if self.updated_at < self.created_at {
            return Err(Error::validation("Note updated_at must not precede created_at"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteDetail {
    pub note: Note,
    pub images: Vec<CapturedImage>,
    pub audio: Vec<AudioRecording>,
}

/// List view projection; rebuilt on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub note: Note,
    pub images: Vec<CapturedImage>,
    pub audio: Vec<AudioRecording>,
    pub cover_image: String,
    pub photo_count: usize,
    pub audio_count: usize,
    pub last_edited: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FindNotesResponse {
    pub results: Vec<NoteSummary>,
}

/// Note fields plus the drafts to attach to it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitNote {
    pub id: Option<NoteId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_ids: Vec<ImageId>,
    #[serde(default)]
    pub audio_ids: Vec<AudioId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNote {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub image_ids: Vec<ImageId>,
    #[serde(default)]
    pub audio_ids: Vec<AudioId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRow {
    pub id: i64,
    pub message: String,
}

/// Outcome of attaching drafts: every requested row lands in exactly one list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitReport {
    pub note: Note,
    pub committed_images: Vec<ImageId>,
    pub committed_audio: Vec<AudioId>,
    pub failed_images: Vec<FailedRow>,
    pub failed_audio: Vec<FailedRow>,
}

impl CommitReport {
    pub fn is_complete(&self) -> bool {
        self.failed_images.is_empty() && self.failed_audio.is_empty()
    }
}
