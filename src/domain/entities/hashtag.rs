//! Hashtag entity, caption parsing and repository trait.
//!
//! Maps to the `hashtags` table; links live in `post_hashtags` and are
//! written by the post repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Maximum stored length of a hashtag name.
pub const MAX_HASHTAG_LEN: usize = 100;

static HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\w+)").expect("valid hashtag regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hashtag {
    pub id: i64,
    /// Lowercase, without the leading `#`
    pub name: String,
    /// Number of posts linked to this hashtag
    pub posts_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Extract unique, lowercased hashtags from free text in order of first use.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for cap in HASHTAG.captures_iter(text) {
        let tag = cap[1].to_lowercase();
        if tag.len() <= MAX_HASHTAG_LEN && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Normalise a user-supplied hashtag name (`#Travel` -> `travel`).
pub fn normalize_hashtag(name: &str) -> String {
    name.trim().trim_start_matches('#').to_lowercase()
}

/// Repository trait for hashtags.
#[async_trait]
pub trait HashtagRepository: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<Hashtag>, AppError>;

    /// Hashtags with the most posts.
    async fn trending(&self, limit: i64) -> Result<Vec<Hashtag>, AppError>;

    /// Hashtags whose name starts with `prefix`, most used first.
    async fn search(&self, prefix: &str, limit: i64) -> Result<Vec<Hashtag>, AppError>;
}
