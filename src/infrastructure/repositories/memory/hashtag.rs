use async_trait::async_trait;

use super::MemoryStore;
use crate::domain::{Hashtag, HashtagRepository};
use crate::shared::error::AppError;

pub struct MemoryHashtagRepository {
    store: MemoryStore,
}

impl MemoryHashtagRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    fn ranked(&self, limit: i64, filter: impl Fn(&Hashtag) -> bool) -> Vec<Hashtag> {
        let tables = self.store.tables().read();
        let mut tags: Vec<Hashtag> = tables.hashtags.values().filter(|h| filter(h)).cloned().collect();
        tags.sort_by(|a, b| b.posts_count.cmp(&a.posts_count).then_with(|| a.name.cmp(&b.name)));
        tags.truncate(limit.max(0) as usize);
        tags
    }
}

#[async_trait]
impl HashtagRepository for MemoryHashtagRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<Hashtag>, AppError> {
        Ok(self.store.tables().read().hashtags.get(name).cloned())
    }

    async fn trending(&self, limit: i64) -> Result<Vec<Hashtag>, AppError> {
        Ok(self.ranked(limit, |h| h.posts_count > 0))
    }

    async fn search(&self, prefix: &str, limit: i64) -> Result<Vec<Hashtag>, AppError> {
        Ok(self.ranked(limit, |h| h.name.starts_with(prefix)))
    }
}
