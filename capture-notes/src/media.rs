//! Encoding helpers for captured media: base64 text, data URIs, JPEG
//! thumbnails, display durations and capture file names.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage};

use crate::{Error, Result};

pub const THUMBNAIL_QUALITY: u8 = 70;

pub async fn file_to_base64(path: impl AsRef<Path>) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(encode_base64(bytes))
}

pub fn encode_base64(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| Error::validation(format!("Invalid base64 payload: {e}")))
}

pub fn base64_to_data_uri(base64: &str, mime_type: &str) -> String {
    format!("data:{mime_type};base64,{base64}")
}

/// Downscales to at most `max_width` pixels wide, keeping the aspect ratio,
/// and returns the JPEG as base64. Narrower images are re-encoded at their size.
pub fn create_thumbnail(bytes: &[u8], max_width: u32) -> Result<String> {
    let source = image::load_from_memory(bytes)?;
    let max_width = max_width.max(1);

    let thumbnail = if source.width() > max_width {
        let height = (u64::from(source.height()) * u64::from(max_width) / u64::from(source.width())).max(1);
        source.resize_exact(max_width, height as u32, FilterType::Triangle)
    } else {
        source
    };

    let mut out = Vec::new();
    DynamicImage::ImageRgb8(thumbnail.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut out, THUMBNAIL_QUALITY))?;

    Ok(encode_base64(out))
}

pub async fn create_thumbnail_from_file(path: impl AsRef<Path>, max_width: u32) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    create_thumbnail(&bytes, max_width)
}

pub fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    let image = image::load_from_memory(bytes)?;
    Ok((image.width(), image.height()))
}

/// `<prefix>_<unix millis>_<random hex>.<extension>`
pub fn generate_file_name(prefix: &str, extension: &str) -> String {
    format!(
        "{prefix}_{}_{:08x}.{extension}",
        Utc::now().timestamp_millis(),
        rand::random::<u32>()
    )
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "audio/m4a" | "audio/mp4" | "audio/x-m4a" => "m4a",
        "audio/mpeg" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/webm" => "webm",
        "audio/aac" => "aac",
        _ => "bin",
    }
}

/// `MM:SS`, truncating fractions. Minutes keep counting past 99.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}
