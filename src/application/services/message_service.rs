//! Message Service
//!
//! Sending, editing and deleting messages inside conversations, plus emoji
//! reactions. Every operation requires membership of the conversation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument};

use super::support::{membership, message_responses};
use crate::application::dto::request::{parse_id, EditMessageRequest, ReactionRequest, SendMessageRequest};
use crate::application::dto::response::{MessageResponse, Paginated};
use crate::domain::{
    ConversationRepository, Message, MessageRepository, Page, Pagination, Reaction, UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

#[async_trait]
pub trait MessageService: Send + Sync {
    async fn send(&self, user_id: i64, conversation_id: i64, request: SendMessageRequest) -> Result<MessageResponse, MessageError>;

    /// Newest first
    async fn list(
        &self,
        user_id: i64,
        conversation_id: i64,
        pagination: Pagination,
    ) -> Result<Paginated<MessageResponse>, MessageError>;

    async fn edit(&self, user_id: i64, message_id: i64, request: EditMessageRequest) -> Result<MessageResponse, MessageError>;

    async fn delete(&self, user_id: i64, message_id: i64) -> Result<(), MessageError>;

    async fn react(&self, user_id: i64, message_id: i64, request: ReactionRequest) -> Result<MessageResponse, MessageError>;

    async fn unreact(&self, user_id: i64, message_id: i64, emoji: &str) -> Result<MessageResponse, MessageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Message not found")]
    NotFound,

    #[error("Replied message not found in this conversation")]
    ReplyNotFound,

    #[error("Access denied")]
    AccessDenied,

    #[error("Reaction already added")]
    AlreadyReacted,

    #[error("Reaction not found")]
    ReactionNotFound,

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<MessageError> for AppError {
    fn from(err: MessageError) -> Self {
        let message = err.to_string();
        match err {
            MessageError::NotFound => AppError::not_found("MESSAGE_NOT_FOUND", message),
            MessageError::ReplyNotFound => AppError::invalid_field("replyToId", &message),
            MessageError::AccessDenied => AppError::access_denied(),
            MessageError::AlreadyReacted => AppError::bad_request("ALREADY_REACTED", message),
            MessageError::ReactionNotFound => AppError::not_found("REACTION_NOT_FOUND", message),
            MessageError::App(e) => e,
        }
    }
}

pub struct MessageServiceImpl {
    users: Arc<dyn UserRepository>,
    conversations: Arc<dyn ConversationRepository>,
    messages: Arc<dyn MessageRepository>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl MessageServiceImpl {
    pub fn new(
        users: Arc<dyn UserRepository>,
        conversations: Arc<dyn ConversationRepository>,
        messages: Arc<dyn MessageRepository>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            users,
            conversations,
            messages,
            id_generator,
        }
    }

    /// A message in a conversation the caller belongs to.
    async fn accessible(&self, user_id: i64, message_id: i64) -> Result<Message, MessageError> {
        let message = self
            .messages
            .find_by_id(message_id)
            .await?
            .ok_or(MessageError::NotFound)?;
        membership(self.conversations.as_ref(), message.conversation_id, user_id).await?;
        Ok(message)
    }

    async fn present(&self, message: Message) -> Result<MessageResponse, MessageError> {
        message_responses(self.users.as_ref(), self.messages.as_ref(), vec![message])
            .await?
            .pop()
            .ok_or(MessageError::NotFound)
    }
}

#[async_trait]
impl MessageService for MessageServiceImpl {
    #[instrument(skip(self, request))]
    async fn send(&self, user_id: i64, conversation_id: i64, request: SendMessageRequest) -> Result<MessageResponse, MessageError> {
        membership(self.conversations.as_ref(), conversation_id, user_id).await?;

        let reply_to_id = request.reply_to_id.as_deref().map(parse_id);
        if let Some(reply_to_id) = reply_to_id {
            self.messages
                .find_by_id(reply_to_id)
                .await?
                .filter(|m| m.conversation_id == conversation_id)
                .ok_or(MessageError::ReplyNotFound)?;
        }

        let message = Message::new(
            self.id_generator.generate(),
            conversation_id,
            user_id,
            request.content,
            reply_to_id,
        );
        let message = self.messages.create(&message).await?;

        info!(message_id = message.id, conversation_id, "Message sent");
        self.present(message).await
    }

    async fn list(
        &self,
        user_id: i64,
        conversation_id: i64,
        pagination: Pagination,
    ) -> Result<Paginated<MessageResponse>, MessageError> {
        membership(self.conversations.as_ref(), conversation_id, user_id).await?;

        let page = self.messages.find_by_conversation(conversation_id, pagination).await?;
        let total = page.total;
        let items = message_responses(self.users.as_ref(), self.messages.as_ref(), page.items).await?;
        Ok(Paginated::new(Page::new(items, total), pagination))
    }

    #[instrument(skip(self, request))]
    async fn edit(&self, user_id: i64, message_id: i64, request: EditMessageRequest) -> Result<MessageResponse, MessageError> {
        let mut message = self.accessible(user_id, message_id).await?;
        if !message.is_sent_by(user_id) {
            return Err(MessageError::AccessDenied);
        }

        message.content = request.content;
        message.edited_at = Some(Utc::now());
        let message = self.messages.update(&message).await?;
        self.present(message).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, user_id: i64, message_id: i64) -> Result<(), MessageError> {
        let message = self.accessible(user_id, message_id).await?;
        if !message.is_sent_by(user_id) {
            return Err(MessageError::AccessDenied);
        }

        self.messages.delete(message_id).await?;
        info!(message_id, "Message deleted");
        Ok(())
    }

    #[instrument(skip(self, request))]
    async fn react(&self, user_id: i64, message_id: i64, request: ReactionRequest) -> Result<MessageResponse, MessageError> {
        let message = self.accessible(user_id, message_id).await?;

        let reaction = Reaction::new(message_id, user_id, request.emoji);
        if !self.messages.add_reaction(&reaction).await? {
            return Err(MessageError::AlreadyReacted);
        }
        self.present(message).await
    }

    #[instrument(skip(self))]
    async fn unreact(&self, user_id: i64, message_id: i64, emoji: &str) -> Result<MessageResponse, MessageError> {
        let message = self.accessible(user_id, message_id).await?;

        if !self.messages.remove_reaction(message_id, user_id, emoji).await? {
            return Err(MessageError::ReactionNotFound);
        }
        self.present(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Conversation, ConversationKind, ConversationMember, MemberRole, User};
    use crate::infrastructure::repositories::{MemoryStore, Repositories};

    const CONVERSATION: i64 = 50;

    async fn setup() -> (MessageServiceImpl, Repositories) {
        let repos = Repositories::in_memory(MemoryStore::new());
        for id in 1..=3 {
            let user = User::new(id, format!("user{id}"), format!("u{id}@example.com"), "hash".into());
            repos.users.create(&user).await.unwrap();
        }
        let conversation = Conversation::new(CONVERSATION, ConversationKind::Direct, None, 1);
        let members = [
            ConversationMember::new(CONVERSATION, 1, MemberRole::Member),
            ConversationMember::new(CONVERSATION, 2, MemberRole::Member),
        ];
        repos.conversations.create(&conversation, &members).await.unwrap();

        let service = MessageServiceImpl::new(
            repos.users.clone(),
            repos.conversations.clone(),
            repos.messages.clone(),
            Arc::new(SnowflakeGenerator::new(1, 0)),
        );
        (service, repos)
    }

    fn text(content: &str) -> SendMessageRequest {
        SendMessageRequest {
            content: content.into(),
            reply_to_id: None,
        }
    }

    #[tokio::test]
    async fn test_send_bumps_conversation_activity() {
        let (service, repos) = setup().await;
        let sent = service.send(1, CONVERSATION, text("hello")).await.unwrap();
        assert_eq!(sent.sender.username, "user1");

        let conversation = repos.conversations.find_by_id(CONVERSATION).await.unwrap().unwrap();
        assert!(conversation.last_message_at.is_some());
    }

    #[tokio::test]
    async fn test_non_member_cannot_send_or_read() {
        let (service, _) = setup().await;
        let err = service.send(3, CONVERSATION, text("intruder")).await.unwrap_err();
        assert_eq!(AppError::from(err).code(), "ACCESS_DENIED");

        let err = service.list(3, CONVERSATION, Pagination::default()).await.unwrap_err();
        assert_eq!(AppError::from(err).code(), "ACCESS_DENIED");
    }

    #[tokio::test]
    async fn test_reply_must_exist_in_conversation() {
        let (service, _) = setup().await;
        let first = service.send(1, CONVERSATION, text("question")).await.unwrap();

        let reply = SendMessageRequest {
            content: "answer".into(),
            reply_to_id: Some(first.id.clone()),
        };
        let sent = service.send(2, CONVERSATION, reply).await.unwrap();
        assert_eq!(sent.reply_to_id, Some(first.id));

        let dangling = SendMessageRequest {
            content: "lost".into(),
            reply_to_id: Some("123456".into()),
        };
        assert!(matches!(
            service.send(2, CONVERSATION, dangling).await,
            Err(MessageError::ReplyNotFound)
        ));
    }

    #[tokio::test]
    async fn test_only_sender_edits() {
        let (service, _) = setup().await;
        let sent = service.send(1, CONVERSATION, text("typo")).await.unwrap();
        let id: i64 = sent.id.parse().unwrap();
        let edit = || EditMessageRequest { content: "fixed".into() };

        assert!(matches!(service.edit(2, id, edit()).await, Err(MessageError::AccessDenied)));
        let edited = service.edit(1, id, edit()).await.unwrap();
        assert_eq!(edited.content, "fixed");
        assert!(edited.edited_at.is_some());
    }

    #[tokio::test]
    async fn test_one_reaction_per_emoji() {
        let (service, _) = setup().await;
        let sent = service.send(1, CONVERSATION, text("nice")).await.unwrap();
        let id: i64 = sent.id.parse().unwrap();
        let heart = || ReactionRequest { emoji: "❤️".into() };

        assert_eq!(service.react(2, id, heart()).await.unwrap().reactions.len(), 1);
        assert!(matches!(service.react(2, id, heart()).await, Err(MessageError::AlreadyReacted)));

        let thumbs = ReactionRequest { emoji: "👍".into() };
        assert_eq!(service.react(2, id, thumbs).await.unwrap().reactions.len(), 2);

        assert_eq!(service.unreact(2, id, "❤️").await.unwrap().reactions.len(), 1);
        assert!(matches!(service.unreact(2, id, "❤️").await, Err(MessageError::ReactionNotFound)));
    }
}
