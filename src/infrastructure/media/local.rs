//! Local filesystem media store.
//!
//! Files are written under `upload_dir/{folder}/{key}.{ext}` and served by
//! the HTTP layer from `public_base_url`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, instrument};

use super::{detect_kind, extension_for, process_image, MediaError, MediaStore, StoredMedia, UploadOptions};
use crate::config::MediaSettings;
use crate::domain::MediaKind;

pub struct LocalMediaStore {
    root: PathBuf,
    public_base_url: String,
    max_file_size: usize,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str, max_file_size: usize) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            max_file_size,
        }
    }

    pub fn from_settings(settings: &MediaSettings) -> Self {
        Self::new(&settings.upload_dir, &settings.public_base_url, settings.max_file_size)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a public URL back to a path under `root`.
    fn path_for_url(&self, url: &str) -> Result<PathBuf, MediaError> {
        let relative = url
            .strip_prefix(&self.public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| MediaError::ForeignUrl(url.to_string()))?;

        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(MediaError::ForeignUrl(url.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    #[instrument(skip(self, data), fields(size = data.len(), folder = %options.folder))]
    async fn upload(
        &self,
        data: Bytes,
        content_type: &str,
        options: UploadOptions,
    ) -> Result<StoredMedia, MediaError> {
        if data.len() > self.max_file_size {
            return Err(MediaError::TooLarge {
                size: data.len(),
                max: self.max_file_size,
            });
        }

        let kind = detect_kind(content_type, &data)?;

        let (bytes, ext, width, height) = match (kind, options.transform) {
            (MediaKind::Image, Some(profile)) => {
                let processed = process_image(data, profile).await?;
                (
                    Bytes::from(processed.data),
                    "jpg".to_string(),
                    Some(processed.width),
                    Some(processed.height),
                )
            }
            _ => (data, extension_for(content_type), None, None),
        };

        let dir = self.root.join(&options.folder);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", options.key, ext);
        tokio::fs::write(dir.join(&file_name), &bytes).await?;

        let url = format!("{}/{}/{}", self.public_base_url, options.folder, file_name);
        debug!(url = %url, "Media stored");

        Ok(StoredMedia {
            url,
            width,
            height,
            kind,
            size: bytes.len(),
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, url: &str) -> Result<(), MediaError> {
        let path = self.path_for_url(url)?;
        tokio::fs::remove_file(&path).await?;
        debug!(path = %path.display(), "Media removed");
        Ok(())
    }
}
