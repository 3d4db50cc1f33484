//! Media Store
//!
//! Uploaded post images, story media and avatars go through a [`MediaStore`].
//! Images are decoded and re-encoded through a [`TransformProfile`] before
//! they are written; videos are stored as received.
//!
//! Callers treat [`MediaStore::delete`] as best-effort: a failed removal is
//! logged and counted, never surfaced to the client.

mod local;
mod memory;
mod transform;

pub use local::LocalMediaStore;
pub use memory::InMemoryMediaStore;
pub use transform::{apply_profile, process_image, ProcessedImage};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use thiserror::Error;

use crate::config::TransformProfile;
use crate::domain::MediaKind;
use crate::shared::error::AppError;

/// Where and how an upload is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    /// Logical folder, e.g. `posts`, `stories`, `avatars`
    pub folder: String,
    /// File name without extension, see [`media_key`]
    pub key: String,
    /// Transformation applied to images; `None` stores them unmodified
    pub transform: Option<TransformProfile>,
}

impl UploadOptions {
    pub fn new(folder: &str, key: String, transform: Option<TransformProfile>) -> Self {
        Self {
            folder: folder.to_string(),
            key,
            transform,
        }
    }
}

/// A stored media item.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMedia {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub kind: MediaKind,
    pub size: usize,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Unsupported media type: {0}")]
    UnsupportedType(String),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("Image could not be processed: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL does not belong to this media store: {0}")]
    ForeignUrl(String),

    #[error("Media task failed: {0}")]
    Task(String),
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::UnsupportedType(_) | MediaError::TooLarge { .. } | MediaError::Image(_) => {
                AppError::invalid_field("media", &err.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Storage backend for uploaded media.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(
        &self,
        data: Bytes,
        content_type: &str,
        options: UploadOptions,
    ) -> Result<StoredMedia, MediaError>;

    /// Remove a previously uploaded item by its public URL.
    async fn delete(&self, url: &str) -> Result<(), MediaError>;
}

/// Upload key `"{user_id}_{unix_millis}_{index}_{nonce}"`. The nonce keeps
/// two uploads in the same millisecond from sharing a URL.
pub fn media_key(user_id: i64, index: usize) -> String {
    format!(
        "{}_{}_{}_{:08x}",
        user_id,
        Utc::now().timestamp_millis(),
        index,
        rand::random::<u32>()
    )
}

/// Classify an upload. `image/*` and `video/*` are trusted; a missing or
/// generic type falls back to sniffing the image header.
pub fn detect_kind(content_type: &str, data: &[u8]) -> Result<MediaKind, MediaError> {
    if content_type.starts_with("video/") {
        Ok(MediaKind::Video)
    } else if content_type.starts_with("image/") || image::guess_format(data).is_ok() {
        Ok(MediaKind::Image)
    } else {
        Err(MediaError::UnsupportedType(content_type.to_string()))
    }
}

/// File extension for content stored without re-encoding.
pub(crate) fn extension_for(content_type: &str) -> String {
    let subtype = content_type
        .split_once('/')
        .map(|(_, s)| s)
        .unwrap_or_default()
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();

    match subtype {
        "jpeg" => "jpg".into(),
        "quicktime" => "mov".into(),
        s if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()) => s.to_string(),
        _ => "bin".into(),
    }
}
