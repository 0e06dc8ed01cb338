use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub type ImageId = i64;
pub type AudioId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedImage {
    pub id: ImageId,
    pub note_id: Option<String>,
    pub image_data: String,
    pub thumbnail_data: String,
    pub file_name: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub created_at: DateTime<Utc>,
    pub saved: bool,
}

/// Image row before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewImage {
    pub note_id: Option<String>,
    pub image_data: String,
    pub thumbnail_data: String,
    pub file_name: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub created_at: DateTime<Utc>,
    pub saved: bool,
}

impl NewImage {
    pub fn validate(&self) -> Result<()> {
        validate_lifecycle(self.saved, self.note_id.as_deref())
    }

    pub fn with_id(self, id: ImageId) -> CapturedImage {
        CapturedImage {
            id,
            note_id: self.note_id,
            image_data: self.image_data,
            thumbnail_data: self.thumbnail_data,
            file_name: self.file_name,
            mime_type: self.mime_type,
            width: self.width,
            height: self.height,
            created_at: self.created_at,
            saved: self.saved,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioRecording {
    pub id: AudioId,
    pub note_id: Option<String>,
    pub audio_data: String,
    pub file_name: String,
    pub mime_type: String,
    /// Seconds.
    pub duration: f64,
    pub created_at: DateTime<Utc>,
    pub saved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAudio {
    pub note_id: Option<String>,
    pub audio_data: String,
    pub file_name: String,
    pub mime_type: String,
    pub duration: f64,
    pub created_at: DateTime<Utc>,
    pub saved: bool,
}

impl NewAudio {
    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(Error::validation("Audio duration must be a non-negative number of seconds"));
        }
        validate_lifecycle(self.saved, self.note_id.as_deref())
    }

    pub fn with_id(self, id: AudioId) -> AudioRecording {
        AudioRecording {
            id,
            note_id: self.note_id,
            audio_data: self.audio_data,
            file_name: self.file_name,
            mime_type: self.mime_type,
            duration: self.duration,
            created_at: self.created_at,
            saved: self.saved,
        }
    }
}

/// `saved` implies an owning note; a blank note id counts as none.
fn validate_lifecycle(saved: bool, note_id: Option<&str>) -> Result<()> {
    match note_id {
        Some(id) if id.trim().is_empty() => Err(Error::validation("Note id must not be empty")),
        None if saved => Err(Error::validation("Committed media requires a note id")),
        _ => Ok(()),
    }
}

pub(crate) fn validate_target_note(note_id: &str) -> Result<()> {
    validate_lifecycle(true, Some(note_id).filter(|id| !id.is_empty()))
}

/// Drafts awaiting review, as shown after an interrupted capture session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drafts {
    pub images: Vec<CapturedImage>,
    pub audio: Vec<AudioRecording>,
}

#[derive(Debug, Deserialize)]
pub struct CaptureImage {
    /// Base64 encoded image.
    pub image_data: String,
    pub mime_type: String,
    pub thumbnail_data: Option<String>,
    pub file_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CaptureAudio {
    /// Base64 encoded audio.
    pub audio_data: String,
    pub mime_type: String,
    pub duration: f64,
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptureCreated {
    pub id: i64,
    pub file_name: String,
}
