use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::MemoryStore;
use crate::domain::{
    Conversation, ConversationKind, ConversationMember, ConversationRepository, Page, Pagination,
};
use crate::shared::error::AppError;

pub struct MemoryConversationRepository {
    store: MemoryStore,
}

impl MemoryConversationRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ConversationRepository for MemoryConversationRepository {
    async fn create(
        &self,
        conversation: &Conversation,
        members: &[ConversationMember],
    ) -> Result<Conversation, AppError> {
        let mut tables = self.store.tables().write();
        tables.conversations.insert(conversation.id, conversation.clone());
        for member in members {
            let mut member = member.clone();
            member.conversation_id = conversation.id;
            tables.members.insert((conversation.id, member.user_id), member);
        }
        Ok(conversation.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Conversation>, AppError> {
        Ok(self.store.tables().read().conversations.get(&id).cloned())
    }

    async fn find_direct(&self, user_a: i64, user_b: i64) -> Result<Option<Conversation>, AppError> {
        let tables = self.store.tables().read();
        Ok(tables
            .conversations
            .values()
            .filter(|c| c.kind == ConversationKind::Direct)
            .find(|c| {
                tables.members.contains_key(&(c.id, user_a)) && tables.members.contains_key(&(c.id, user_b))
            })
            .cloned())
    }

    async fn find_for_user(&self, user_id: i64, pagination: Pagination) -> Result<Page<Conversation>, AppError> {
        let tables = self.store.tables().read();
        let mut conversations: Vec<Conversation> = tables
            .conversations
            .values()
            .filter(|c| tables.members.contains_key(&(c.id, user_id)))
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.activity_at().cmp(&a.activity_at()).then(b.id.cmp(&a.id)));
        Ok(Page::from_vec(conversations, pagination))
    }

    async fn members(&self, conversation_id: i64) -> Result<Vec<ConversationMember>, AppError> {
        let tables = self.store.tables().read();
        let mut members: Vec<ConversationMember> = tables
            .members
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| (m.joined_at, m.user_id));
        Ok(members)
    }

    async fn find_member(&self, conversation_id: i64, user_id: i64) -> Result<Option<ConversationMember>, AppError> {
        Ok(self
            .store
            .tables()
            .read()
            .members
            .get(&(conversation_id, user_id))
            .cloned())
    }

    async fn add_members(&self, members: &[ConversationMember]) -> Result<(), AppError> {
        let mut tables = self.store.tables().write();
        for member in members {
            tables
                .members
                .entry((member.conversation_id, member.user_id))
                .or_insert_with(|| member.clone());
        }
        Ok(())
    }

    async fn remove_member(&self, conversation_id: i64, user_id: i64) -> Result<bool, AppError> {
        Ok(self
            .store
            .tables()
            .write()
            .members
            .remove(&(conversation_id, user_id))
            .is_some())
    }

    async fn update(&self, conversation: &Conversation) -> Result<Conversation, AppError> {
        let mut tables = self.store.tables().write();
        let stored = tables
            .conversations
            .get_mut(&conversation.id)
            .ok_or_else(|| AppError::not_found("CONVERSATION_NOT_FOUND", "Conversation not found"))?;
        stored.name = conversation.name.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.store.tables().write();
        if tables.conversations.remove(&id).is_none() {
            return Ok(false);
        }
        tables.members.retain(|(conversation_id, _), _| *conversation_id != id);
        let message_ids: Vec<i64> = tables
            .messages
            .values()
            .filter(|m| m.conversation_id == id)
            .map(|m| m.id)
            .collect();
        for message_id in message_ids {
            tables.remove_message(message_id);
        }
        Ok(true)
    }

    async fn mark_read(&self, conversation_id: i64, user_id: i64, at: DateTime<Utc>) -> Result<(), AppError> {
        if let Some(member) = self.store.tables().write().members.get_mut(&(conversation_id, user_id)) {
            member.last_read_at = Some(at);
        }
        Ok(())
    }

    async fn unread_count(&self, conversation_id: i64, user_id: i64) -> Result<i64, AppError> {
        let tables = self.store.tables().read();
        let Some(member) = tables.members.get(&(conversation_id, user_id)) else {
            return Ok(0);
        };
        Ok(tables
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id && m.sender_id != user_id)
            .filter(|m| member.last_read_at.map_or(true, |read| m.created_at > read))
            .count() as i64)
    }
}
