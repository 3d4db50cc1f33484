//! Message and Reaction entities and the message repository trait.
//!
//! Maps to the `messages` and `message_reactions` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Page, Pagination};
use crate::shared::error::AppError;

/// A message inside a conversation, optionally replying to another message
/// of the same conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub reply_to_id: Option<i64>,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(id: i64, conversation_id: i64, sender_id: i64, content: String, reply_to_id: Option<i64>) -> Self {
        Self {
            id,
            conversation_id,
            sender_id,
            content,
            reply_to_id,
            edited_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_sent_by(&self, user_id: i64) -> bool {
        self.sender_id == user_id
    }
}

/// An emoji reaction. The composite key `(message_id, user_id, emoji)`
/// allows one reaction per user per emoji per message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub message_id: i64,
    pub user_id: i64,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

impl Reaction {
    pub fn new(message_id: i64, user_id: i64, emoji: String) -> Self {
        Self {
            message_id,
            user_id,
            emoji,
            created_at: Utc::now(),
        }
    }
}

/// Repository trait for messages and reactions.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Insert the message and bump the conversation's `last_message_at`, atomically.
    async fn create(&self, message: &Message) -> Result<Message, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError>;

    /// Write content and `edited_at`.
    async fn update(&self, message: &Message) -> Result<Message, AppError>;

    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    /// Messages of a conversation, newest first.
    async fn find_by_conversation(&self, conversation_id: i64, pagination: Pagination) -> Result<Page<Message>, AppError>;

    /// Most recent message of a conversation.
    async fn latest(&self, conversation_id: i64) -> Result<Option<Message>, AppError>;

    /// Returns `false` if the same user already reacted with the same emoji.
    async fn add_reaction(&self, reaction: &Reaction) -> Result<bool, AppError>;

    async fn remove_reaction(&self, message_id: i64, user_id: i64, emoji: &str) -> Result<bool, AppError>;

    /// All reactions on the given messages, oldest first.
    async fn reactions(&self, message_ids: &[i64]) -> Result<Vec<Reaction>, AppError>;
}
