//! Message Repository Implementation
//!
//! PostgreSQL implementation of the MessageRepository trait. Inserting a
//! message bumps the conversation's `last_message_at` in the same transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Message, MessageRepository, Page, Pagination, Reaction};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    conversation_id: i64,
    sender_id: i64,
    content: String,
    reply_to_id: Option<i64>,
    edited_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_id: row.sender_id,
            content: row.content,
            reply_to_id: row.reply_to_id,
            edited_at: row.edited_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReactionRow {
    message_id: i64,
    user_id: i64,
    emoji: String,
    created_at: DateTime<Utc>,
}

impl From<ReactionRow> for Reaction {
    fn from(row: ReactionRow) -> Self {
        Reaction {
            message_id: row.message_id,
            user_id: row.user_id,
            emoji: row.emoji,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL message repository implementation.
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content, reply_to_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, conversation_id, sender_id, content, reply_to_id, edited_at, created_at
            "#,
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.reply_to_id)
        .bind(message.created_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET last_message_at = $2 WHERE id = $1")
            .bind(message.conversation_id)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, conversation_id, sender_id, content, reply_to_id, edited_at, created_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn update(&self, message: &Message) -> Result<Message, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            UPDATE messages SET content = $2, edited_at = $3
            WHERE id = $1
            RETURNING id, conversation_id, sender_id, content, reply_to_id, edited_at, created_at
            "#,
        )
        .bind(message.id)
        .bind(&message.content)
        .bind(message.edited_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("MESSAGE_NOT_FOUND", "Message not found"))?;

        Ok(row.into())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_conversation(&self, conversation_id: i64, pagination: Pagination) -> Result<Page<Message>, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
            .bind(conversation_id)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, conversation_id, sender_id, content, reply_to_id, edited_at, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(conversation_id)
        .bind(pagination.take())
        .bind(pagination.skip())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(rows.into_iter().map(Into::into).collect(), total))
    }

    async fn latest(&self, conversation_id: i64) -> Result<Option<Message>, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, conversation_id, sender_id, content, reply_to_id, edited_at, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn add_reaction(&self, reaction: &Reaction) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO message_reactions (message_id, user_id, emoji, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (message_id, user_id, emoji) DO NOTHING
            "#,
        )
        .bind(reaction.message_id)
        .bind(reaction.user_id)
        .bind(&reaction.emoji)
        .bind(reaction.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_reaction(&self, message_id: i64, user_id: i64, emoji: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM message_reactions WHERE message_id = $1 AND user_id = $2 AND emoji = $3",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reactions(&self, message_ids: &[i64]) -> Result<Vec<Reaction>, AppError> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, ReactionRow>(
            r#"
            SELECT message_id, user_id, emoji, created_at
            FROM message_reactions
            WHERE message_id = ANY($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(message_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
