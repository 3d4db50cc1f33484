//! Conversation and membership entities and the conversation repository trait.
//!
//! Maps to the `conversations` and `conversation_members` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Page, Pagination};
use crate::shared::error::AppError;

/// Direct (exactly two members, unique per pair) or group conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Direct,
    Group,
}

impl ConversationKind {
    pub fn from_str(s: &str) -> Self {
        match s {
            "group" => Self::Group,
            _ => Self::Direct,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Group => "group",
        }
    }
}

/// Role of a member inside a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Admin,
    Member,
}

impl MemberRole {
    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => Self::Admin,
            _ => Self::Member,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub kind: ConversationKind,
    pub name: Option<String>,
    pub created_by: i64,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: i64, kind: ConversationKind, name: Option<String>, created_by: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            name,
            created_by,
            last_message_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_group(&self) -> bool {
        self.kind == ConversationKind::Group
    }

    /// Timestamp conversations are ordered by in listings.
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.last_message_at.unwrap_or(self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMember {
    pub conversation_id: i64,
    pub user_id: i64,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
    pub last_read_at: Option<DateTime<Utc>>,
}

impl ConversationMember {
    pub fn new(conversation_id: i64, user_id: i64, role: MemberRole) -> Self {
        Self {
            conversation_id,
            user_id,
            role,
            joined_at: Utc::now(),
            last_read_at: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == MemberRole::Admin
    }
}

/// Repository trait for conversations and their members.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Insert a conversation together with its initial members.
    async fn create(
        &self,
        conversation: &Conversation,
        members: &[ConversationMember],
    ) -> Result<Conversation, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Conversation>, AppError>;

    /// The direct conversation between two users, if any.
    async fn find_direct(&self, user_a: i64, user_b: i64) -> Result<Option<Conversation>, AppError>;

    /// Conversations `user_id` belongs to, latest activity first.
    async fn find_for_user(&self, user_id: i64, pagination: Pagination) -> Result<Page<Conversation>, AppError>;

    async fn members(&self, conversation_id: i64) -> Result<Vec<ConversationMember>, AppError>;

    async fn find_member(&self, conversation_id: i64, user_id: i64) -> Result<Option<ConversationMember>, AppError>;

    /// Add members; users who already belong are left untouched.
    async fn add_members(&self, members: &[ConversationMember]) -> Result<(), AppError>;

    async fn remove_member(&self, conversation_id: i64, user_id: i64) -> Result<bool, AppError>;

    /// Write the conversation name.
    async fn update(&self, conversation: &Conversation) -> Result<Conversation, AppError>;

    /// Delete the conversation; members and messages cascade.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    /// Set the member's read marker.
    async fn mark_read(&self, conversation_id: i64, user_id: i64, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Messages from other members newer than the member's read marker.
    async fn unread_count(&self, conversation_id: i64, user_id: i64) -> Result<i64, AppError>;
}
