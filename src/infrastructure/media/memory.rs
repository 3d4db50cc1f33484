//! In-memory media store for tests and demos.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use super::{detect_kind, extension_for, MediaError, MediaStore, StoredMedia, UploadOptions};

const URL_PREFIX: &str = "memory://";

/// Keeps uploads in a map keyed by URL. Images are not decoded.
#[derive(Default)]
pub struct InMemoryMediaStore {
    files: DashMap<String, Bytes>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.files.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn upload(
        &self,
        data: Bytes,
        content_type: &str,
        options: UploadOptions,
    ) -> Result<StoredMedia, MediaError> {
        let kind = detect_kind(content_type, &data)?;
        let url = format!(
            "{}{}/{}.{}",
            URL_PREFIX,
            options.folder,
            options.key,
            extension_for(content_type)
        );
        let size = data.len();
        self.files.insert(url.clone(), data);

        Ok(StoredMedia {
            url,
            width: None,
            height: None,
            kind,
            size,
        })
    }

    async fn delete(&self, url: &str) -> Result<(), MediaError> {
        self.files
            .remove(url)
            .map(|_| ())
            .ok_or_else(|| MediaError::ForeignUrl(url.to_string()))
    }
}
