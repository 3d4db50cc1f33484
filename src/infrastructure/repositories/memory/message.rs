use async_trait::async_trait;

use super::{newest_first, MemoryStore};
use crate::domain::{Message, MessageRepository, Page, Pagination, Reaction};
use crate::shared::error::AppError;

pub struct MemoryMessageRepository {
    store: MemoryStore,
}

impl MemoryMessageRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        let mut tables = self.store.tables().write();
        let Some(conversation) = tables.conversations.get_mut(&message.conversation_id) else {
            return Err(AppError::not_found("CONVERSATION_NOT_FOUND", "Conversation not found"));
        };
        conversation.last_message_at = Some(message.created_at);
        tables.messages.insert(message.id, message.clone());
        Ok(message.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        Ok(self.store.tables().read().messages.get(&id).cloned())
    }

    async fn update(&self, message: &Message) -> Result<Message, AppError> {
        let mut tables = self.store.tables().write();
        let stored = tables
            .messages
            .get_mut(&message.id)
            .ok_or_else(|| AppError::not_found("MESSAGE_NOT_FOUND", "Message not found"))?;
        stored.content = message.content.clone();
        stored.edited_at = message.edited_at;
        Ok(stored.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.store.tables().write().remove_message(id))
    }

    async fn find_by_conversation(&self, conversation_id: i64, pagination: Pagination) -> Result<Page<Message>, AppError> {
        let tables = self.store.tables().read();
        let mut messages: Vec<Message> = tables
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        newest_first(&mut messages, |m| (m.created_at, m.id));
        Ok(Page::from_vec(messages, pagination))
    }

    async fn latest(&self, conversation_id: i64) -> Result<Option<Message>, AppError> {
        let tables = self.store.tables().read();
        Ok(tables
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .max_by_key(|m| (m.created_at, m.id))
            .cloned())
    }

    async fn add_reaction(&self, reaction: &Reaction) -> Result<bool, AppError> {
        let mut tables = self.store.tables().write();
        let exists = tables.reactions.iter().any(|r| {
            r.message_id == reaction.message_id && r.user_id == reaction.user_id && r.emoji == reaction.emoji
        });
        if exists {
            return Ok(false);
        }
        tables.reactions.push(reaction.clone());
        Ok(true)
    }

    async fn remove_reaction(&self, message_id: i64, user_id: i64, emoji: &str) -> Result<bool, AppError> {
        let mut tables = self.store.tables().write();
        let before = tables.reactions.len();
        tables
            .reactions
            .retain(|r| !(r.message_id == message_id && r.user_id == user_id && r.emoji == emoji));
        Ok(tables.reactions.len() < before)
    }

    async fn reactions(&self, message_ids: &[i64]) -> Result<Vec<Reaction>, AppError> {
        let tables = self.store.tables().read();
        Ok(tables
            .reactions
            .iter()
            .filter(|r| message_ids.contains(&r.message_id))
            .cloned()
            .collect())
    }
}
