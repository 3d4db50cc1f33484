//! Conversation Repository Implementation
//!
//! PostgreSQL implementation of the ConversationRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{
    Conversation, ConversationKind, ConversationMember, ConversationRepository, MemberRole, Page,
    Pagination,
};
use crate::shared::error::AppError;

const CONVERSATION_COLUMNS: &str =
    "c.id, c.kind, c.name, c.created_by, c.last_message_at, c.created_at, c.updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ConversationRow {
    id: i64,
    kind: String,
    name: Option<String>,
    created_by: i64,
    last_message_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Conversation {
            id: row.id,
            kind: ConversationKind::from_str(&row.kind),
            name: row.name,
            created_by: row.created_by,
            last_message_at: row.last_message_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    conversation_id: i64,
    user_id: i64,
    role: String,
    joined_at: DateTime<Utc>,
    last_read_at: Option<DateTime<Utc>>,
}

impl From<MemberRow> for ConversationMember {
    fn from(row: MemberRow) -> Self {
        ConversationMember {
            conversation_id: row.conversation_id,
            user_id: row.user_id,
            role: MemberRole::from_str(&row.role),
            joined_at: row.joined_at,
            last_read_at: row.last_read_at,
        }
    }
}

/// PostgreSQL conversation repository implementation.
#[derive(Clone)]
pub struct PgConversationRepository {
    pool: PgPool,
}

impl PgConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for PgConversationRepository {
    async fn create(
        &self,
        conversation: &Conversation,
        members: &[ConversationMember],
    ) -> Result<Conversation, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO conversations AS c (id, kind, name, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {CONVERSATION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(conversation.id)
            .bind(conversation.kind.as_str())
            .bind(&conversation.name)
            .bind(conversation.created_by)
            .bind(conversation.created_at)
            .fetch_one(&mut *tx)
            .await?;

        for member in members {
            sqlx::query(
                r#"
                INSERT INTO conversation_members (conversation_id, user_id, role, joined_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(conversation.id)
            .bind(member.user_id)
            .bind(member.role.as_str())
            .bind(member.joined_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Conversation>, AppError> {
        let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE c.id = $1");
        let row = sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn find_direct(&self, user_a: i64, user_b: i64) -> Result<Option<Conversation>, AppError> {
        let sql = format!(
            r#"
            SELECT {CONVERSATION_COLUMNS} FROM conversations c
            WHERE c.kind = 'direct'
              AND EXISTS (SELECT 1 FROM conversation_members m WHERE m.conversation_id = c.id AND m.user_id = $1)
              AND EXISTS (SELECT 1 FROM conversation_members m WHERE m.conversation_id = c.id AND m.user_id = $2)
            LIMIT 1
            "#
        );
        let row = sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(user_a)
            .bind(user_b)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn find_for_user(&self, user_id: i64, pagination: Pagination) -> Result<Page<Conversation>, AppError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM conversation_members WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT {CONVERSATION_COLUMNS} FROM conversations c
            JOIN conversation_members m ON m.conversation_id = c.id
            WHERE m.user_id = $1
            ORDER BY COALESCE(c.last_message_at, c.created_at) DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(user_id)
            .bind(pagination.take())
            .bind(pagination.skip())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(rows.into_iter().map(Into::into).collect(), total))
    }

    async fn members(&self, conversation_id: i64) -> Result<Vec<ConversationMember>, AppError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT conversation_id, user_id, role, joined_at, last_read_at
            FROM conversation_members
            WHERE conversation_id = $1
            ORDER BY joined_at ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_member(&self, conversation_id: i64, user_id: i64) -> Result<Option<ConversationMember>, AppError> {
        let row = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT conversation_id, user_id, role, joined_at, last_read_at
            FROM conversation_members
            WHERE conversation_id = $1 AND user_id = $2
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn add_members(&self, members: &[ConversationMember]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for member in members {
            sqlx::query(
                r#"
                INSERT INTO conversation_members (conversation_id, user_id, role, joined_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (conversation_id, user_id) DO NOTHING
                "#,
            )
            .bind(member.conversation_id)
            .bind(member.user_id)
            .bind(member.role.as_str())
            .bind(member.joined_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn remove_member(&self, conversation_id: i64, user_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM conversation_members WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update(&self, conversation: &Conversation) -> Result<Conversation, AppError> {
        let sql = format!(
            r#"
            UPDATE conversations AS c SET name = $2, updated_at = NOW()
            WHERE c.id = $1
            RETURNING {CONVERSATION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(conversation.id)
            .bind(&conversation.name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("CONVERSATION_NOT_FOUND", "Conversation not found"))?;

        Ok(row.into())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_read(&self, conversation_id: i64, user_id: i64, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE conversation_members SET last_read_at = $3 WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn unread_count(&self, conversation_id: i64, user_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM messages msg
            JOIN conversation_members m
              ON m.conversation_id = msg.conversation_id AND m.user_id = $2
            WHERE msg.conversation_id = $1
              AND msg.sender_id <> $2
              AND (m.last_read_at IS NULL OR msg.created_at > m.last_read_at)
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
