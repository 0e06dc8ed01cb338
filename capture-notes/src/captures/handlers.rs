use chrono::{DateTime, Utc};

use crate::{
    media::{self, decode_base64, extension_for_mime, generate_file_name},
    storage::CaptureStore,
    Error, Result,
};

use super::{CaptureAudio, CaptureCreated, CaptureImage, Drafts, NewAudio, NewImage};

/// Stores a photo as a draft. Thumbnail and dimensions are derived from the
/// image bytes unless the client already supplied them.
pub async fn capture_image(
    store: &dyn CaptureStore,
    input: CaptureImage,
    thumbnail_max_width: u32,
    now: DateTime<Utc>,
) -> Result<CaptureCreated> {
    let CaptureImage {
        image_data,
        mime_type,
        thumbnail_data,
        file_name,
        width,
        height,
    } = input;

    require_mime_type(&mime_type)?;
    let bytes = decode_base64(&image_data)?;
    if let Some(thumbnail) = &thumbnail_data {
        decode_base64(thumbnail)?;
    }

    let (thumbnail_data, width, height) = match (thumbnail_data, width, height) {
        (Some(thumbnail), Some(width), Some(height)) => (thumbnail, width, height),
        (thumbnail, width, height) => {
            let (thumbnail, (w, h)) = tokio::task::spawn_blocking(move || -> Result<_> {
                let dimensions = media::image_dimensions(&bytes)?;
                let thumbnail = match thumbnail {
                    Some(thumbnail) => thumbnail,
                    None => media::create_thumbnail(&bytes, thumbnail_max_width)?,
                };
                Ok((thumbnail, dimensions))
            })
            .await
            .map_err(|e| Error::Unexpected(e.to_string()))?
            .map_err(unreadable_image)?;

            (thumbnail, width.unwrap_or(w), height.unwrap_or(h))
        }
    };

    let file_name = file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| generate_file_name("photo", extension_for_mime(&mime_type)));

    let id = store
        .save_image(NewImage {
            note_id: None,
            image_data,
            thumbnail_data,
            file_name: file_name.clone(),
            mime_type,
            width,
            height,
            created_at: now,
            saved: false,
        })
        .await?;

    tracing::info!(id, %file_name, width, height, "image captured");

    Ok(CaptureCreated { id, file_name })
}

pub async fn capture_audio(store: &dyn CaptureStore, input: CaptureAudio, now: DateTime<Utc>) -> Result<CaptureCreated> {
    let CaptureAudio {
        audio_data,
        mime_type,
        duration,
        file_name,
    } = input;

    require_mime_type(&mime_type)?;
    decode_base64(&audio_data)?;

    let file_name = file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| generate_file_name("audio", extension_for_mime(&mime_type)));

    let id = store
        .save_audio(NewAudio {
            note_id: None,
            audio_data,
            file_name: file_name.clone(),
            mime_type,
            duration,
            created_at: now,
            saved: false,
        })
        .await?;

    tracing::info!(id, %file_name, duration, "audio captured");

    Ok(CaptureCreated { id, file_name })
}

/// Everything captured but not yet attached to a note, newest first.
pub async fn list_drafts(store: &dyn CaptureStore) -> Result<Drafts> {
    let (images, audio) = tokio::try_join!(store.get_unsaved_images(), store.get_unsaved_audio())?;
    Ok(Drafts { images, audio })
}

fn require_mime_type(mime_type: &str) -> Result<()> {
    if mime_type.trim().is_empty() {
        return Err(Error::validation("mime_type must not be empty"));
    }
    Ok(())
}

fn unreadable_image(error: Error) -> Error {
    match error {
        Error::Image(e) => Error::validation(format!("Unreadable image: {e}")),
        error => error,
    }
}
