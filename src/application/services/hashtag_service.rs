//! Hashtag Service

use std::sync::Arc;

use async_trait::async_trait;

use super::support::post_page;
use crate::application::dto::response::{HashtagResponse, Paginated, PostResponse};
use crate::domain::{normalize_hashtag, HashtagRepository, Pagination, PostRepository, UserRepository};
use crate::shared::error::AppError;

#[async_trait]
pub trait HashtagService: Send + Sync {
    async fn trending(&self, limit: i64) -> Result<Vec<HashtagResponse>, HashtagError>;

    /// Prefix search, most used first
    async fn search(&self, query: &str, limit: i64) -> Result<Vec<HashtagResponse>, HashtagError>;

    async fn get(&self, name: &str) -> Result<HashtagResponse, HashtagError>;

    /// Public, non-archived posts carrying the hashtag
    async fn posts(
        &self,
        name: &str,
        viewer_id: Option<i64>,
        pagination: Pagination,
    ) -> Result<Paginated<PostResponse>, HashtagError>;
}

#[derive(Debug, thiserror::Error)]
pub enum HashtagError {
    #[error("Hashtag not found")]
    NotFound,

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<HashtagError> for AppError {
    fn from(err: HashtagError) -> Self {
        match err {
            HashtagError::NotFound => AppError::not_found("HASHTAG_NOT_FOUND", err.to_string()),
            HashtagError::App(e) => e,
        }
    }
}

pub struct HashtagServiceImpl {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    hashtags: Arc<dyn HashtagRepository>,
}

impl HashtagServiceImpl {
    pub fn new(
        users: Arc<dyn UserRepository>,
        posts: Arc<dyn PostRepository>,
        hashtags: Arc<dyn HashtagRepository>,
    ) -> Self {
        Self { users, posts, hashtags }
    }
}

#[async_trait]
impl HashtagService for HashtagServiceImpl {
    async fn trending(&self, limit: i64) -> Result<Vec<HashtagResponse>, HashtagError> {
        let tags = self.hashtags.trending(limit).await?;
        Ok(tags.into_iter().map(Into::into).collect())
    }

    async fn search(&self, query: &str, limit: i64) -> Result<Vec<HashtagResponse>, HashtagError> {
        let prefix = normalize_hashtag(query);
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        let tags = self.hashtags.search(&prefix, limit).await?;
        Ok(tags.into_iter().map(Into::into).collect())
    }

    async fn get(&self, name: &str) -> Result<HashtagResponse, HashtagError> {
        self.hashtags
            .find_by_name(&normalize_hashtag(name))
            .await?
            .map(Into::into)
            .ok_or(HashtagError::NotFound)
    }

    async fn posts(
        &self,
        name: &str,
        viewer_id: Option<i64>,
        pagination: Pagination,
    ) -> Result<Paginated<PostResponse>, HashtagError> {
        let name = normalize_hashtag(name);
        if self.hashtags.find_by_name(&name).await?.is_none() {
            return Err(HashtagError::NotFound);
        }

        let page = self.posts.find_by_hashtag(&name, pagination).await?;
        Ok(post_page(self.users.as_ref(), self.posts.as_ref(), page, viewer_id, pagination).await?)
    }
}
