//! User entity and repository trait.
//!
//! Maps to the `users` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Page, Pagination};
use crate::shared::error::AppError;

/// Represents a user account.
///
/// Maps to the `users` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - username: VARCHAR(30) NOT NULL UNIQUE
/// - email: VARCHAR(255) NOT NULL UNIQUE
/// - password_hash: VARCHAR(255) NOT NULL
/// - full_name, bio, website, avatar_url: NULL
/// - is_private, is_verified: BOOLEAN NOT NULL DEFAULT FALSE
/// - posts_count, followers_count, following_count: BIGINT NOT NULL DEFAULT 0
/// - created_at, updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
///
/// The three counters are denormalised and only ever changed inside the
/// same transaction as the row they mirror (posts, accepted follows).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Username (3-30 characters, unique)
    pub username: String,

    /// Email address (unique)
    pub email: String,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub avatar_url: Option<String>,

    /// Private accounts only show content to accepted followers
    pub is_private: bool,
    pub is_verified: bool,

    pub posts_count: i64,
    pub followers_count: i64,
    pub following_count: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A fresh account with zeroed counters.
    pub fn new(id: i64, username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            username,
            email,
            password_hash,
            full_name: None,
            bio: None,
            website: None,
            avatar_url: None,
            is_private: false,
            is_verified: false,
            posts_count: 0,
            followers_count: 0,
            following_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Full name when set, username otherwise.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }
}

/// Repository trait for User data access operations.
///
/// Implementations of this trait handle the actual database interactions.
/// The trait is defined in the domain layer to maintain dependency inversion.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by their Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Find several users at once; missing ids are skipped.
    async fn find_many(&self, ids: &[i64]) -> Result<Vec<User>, AppError>;

    /// Find a user by their email address (case-insensitive).
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Find a user by username (case-insensitive).
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Create a new user.
    async fn create(&self, user: &User) -> Result<User, AppError>;

    /// Update profile fields, avatar, privacy flag and password hash.
    ///
    /// Counters are never written through this method.
    async fn update(&self, user: &User) -> Result<User, AppError>;

    /// Check if an email address is already registered.
    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;

    /// Check if a username is already taken.
    async fn username_exists(&self, username: &str) -> Result<bool, AppError>;

    /// Search by username or full name substring.
    async fn search(&self, query: &str, pagination: Pagination) -> Result<Page<User>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_has_zero_counters() {
        let user = User::new(1, "alice".into(), "a@example.com".into(), "hash".into());
        assert_eq!(user.posts_count, 0);
        assert_eq!(user.followers_count, 0);
        assert_eq!(user.following_count, 0);
        assert!(!user.is_private);
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut user = User::new(1, "alice".into(), "a@example.com".into(), "hash".into());
        assert_eq!(user.display_name(), "alice");
        user.full_name = Some("Alice Liddell".into());
        assert_eq!(user.display_name(), "Alice Liddell");
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User::new(1, "alice".into(), "a@example.com".into(), "secret-hash".into());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
