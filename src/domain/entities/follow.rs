//! Follow edge entity and repository trait.
//!
//! Maps to the `follows` table (composite PK `(follower_id, following_id)`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::User;
use crate::domain::value_objects::{Page, Pagination};
use crate::shared::error::AppError;

/// State of a follow edge. Private accounts receive pending requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowStatus {
    Pending,
    Accepted,
}

impl FollowStatus {
    pub fn from_str(s: &str) -> Self {
        match s {
            "accepted" => Self::Accepted,
            _ => Self::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        }
    }
}

/// A directed follow edge from `follower_id` to `following_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub follower_id: i64,
    pub following_id: i64,
    pub status: FollowStatus,
    pub created_at: DateTime<Utc>,
}

impl Follow {
    pub fn new(follower_id: i64, following_id: i64, status: FollowStatus) -> Self {
        Self {
            follower_id,
            following_id,
            status,
            created_at: Utc::now(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == FollowStatus::Accepted
    }
}

/// Repository trait for follow edges.
///
/// Only accepted edges are reflected in `followers_count` /
/// `following_count`; every method that changes an edge's acceptance applies
/// the counter delta atomically with the edge write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FollowRepository: Send + Sync {
    async fn find(&self, follower_id: i64, following_id: i64) -> Result<Option<Follow>, AppError>;

    /// Insert an edge. Counters move only for accepted edges.
    async fn create(&self, follow: &Follow) -> Result<Follow, AppError>;

    /// Promote a pending edge to accepted. Returns `None` if no pending edge exists.
    async fn accept(&self, follower_id: i64, following_id: i64) -> Result<Option<Follow>, AppError>;

    /// Remove an edge, returning it. Counters move only if it was accepted.
    async fn delete(&self, follower_id: i64, following_id: i64) -> Result<Option<Follow>, AppError>;

    /// Accepted followers of `user_id`.
    async fn followers(&self, user_id: i64, pagination: Pagination) -> Result<Page<User>, AppError>;

    /// Accounts `user_id` follows (accepted).
    async fn following(&self, user_id: i64, pagination: Pagination) -> Result<Page<User>, AppError>;

    /// Users with a pending request towards `user_id`.
    async fn pending_requests(&self, user_id: i64, pagination: Pagination) -> Result<Page<User>, AppError>;

    /// Ids of every account `user_id` follows (accepted).
    async fn following_ids(&self, user_id: i64) -> Result<Vec<i64>, AppError>;
}
