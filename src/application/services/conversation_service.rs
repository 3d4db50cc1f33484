//! Conversation Service
//!
//! Direct (one per pair of users) and group conversations, membership and
//! read markers.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument};

use super::support::{membership, message_responses, Authors};
use crate::application::dto::request::{
    parse_id, AddMembersRequest, CreateConversationRequest, UpdateConversationRequest,
};
use crate::application::dto::response::{ConversationResponse, MemberResponse, Paginated};
use crate::domain::{
    Conversation, ConversationKind, ConversationMember, ConversationRepository, MemberRole,
    MessageRepository, Page, Pagination, UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Outcome of [`ConversationService::create`].
#[derive(Debug)]
pub struct CreatedConversation {
    pub conversation: ConversationResponse,
    /// `false` when an existing direct conversation was returned
    pub created: bool,
}

#[async_trait]
pub trait ConversationService: Send + Sync {
    async fn create(&self, user_id: i64, request: CreateConversationRequest) -> Result<CreatedConversation, ConversationError>;

    /// The caller's conversations, latest activity first
    async fn list(&self, user_id: i64, pagination: Pagination) -> Result<Paginated<ConversationResponse>, ConversationError>;

    async fn get(&self, user_id: i64, conversation_id: i64) -> Result<ConversationResponse, ConversationError>;

    async fn rename(
        &self,
        user_id: i64,
        conversation_id: i64,
        request: UpdateConversationRequest,
    ) -> Result<ConversationResponse, ConversationError>;

    async fn add_members(
        &self,
        user_id: i64,
        conversation_id: i64,
        request: AddMembersRequest,
    ) -> Result<ConversationResponse, ConversationError>;

    /// Admins remove anyone; members may remove themselves
    async fn remove_member(&self, user_id: i64, conversation_id: i64, member_id: i64) -> Result<(), ConversationError>;

    async fn delete(&self, user_id: i64, conversation_id: i64) -> Result<(), ConversationError>;

    async fn mark_read(&self, user_id: i64, conversation_id: i64) -> Result<(), ConversationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("Conversation not found")]
    NotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("At least one other participant is required")]
    NoParticipants,

    #[error("Direct conversations have exactly one other participant")]
    DirectParticipants,

    #[error("Group conversations need a name")]
    NameRequired,

    #[error("Only group conversations support this operation")]
    NotAGroup,

    #[error("User is not a member of this conversation")]
    MemberNotFound,

    #[error("Access denied")]
    AccessDenied,

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<ConversationError> for AppError {
    fn from(err: ConversationError) -> Self {
        let message = err.to_string();
        match err {
            ConversationError::NotFound => AppError::not_found("CONVERSATION_NOT_FOUND", message),
            ConversationError::UserNotFound => AppError::not_found("USER_NOT_FOUND", message),
            ConversationError::NoParticipants | ConversationError::DirectParticipants => {
                AppError::invalid_field("participantIds", &message)
            }
            ConversationError::NameRequired => AppError::invalid_field("name", &message),
            ConversationError::NotAGroup => AppError::bad_request("NOT_A_GROUP", message),
            ConversationError::MemberNotFound => AppError::not_found("MEMBER_NOT_FOUND", message),
            ConversationError::AccessDenied => AppError::access_denied(),
            ConversationError::App(e) => e,
        }
    }
}

pub struct ConversationServiceImpl {
    users: Arc<dyn UserRepository>,
    conversations: Arc<dyn ConversationRepository>,
    messages: Arc<dyn MessageRepository>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl ConversationServiceImpl {
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

    async fn member_of(&self, conversation_id: i64, user_id: i64) -> Result<(Conversation, ConversationMember), ConversationError> {
        Ok(membership(self.conversations.as_ref(), conversation_id, user_id).await?)
    }

    /// Membership check for group administration.
    async fn admin_of(&self, conversation_id: i64, user_id: i64) -> Result<Conversation, ConversationError> {
        let (conversation, member) = self.member_of(conversation_id, user_id).await?;
        if !conversation.is_group() {
            return Err(ConversationError::NotAGroup);
        }
        if !member.is_admin() {
            return Err(ConversationError::AccessDenied);
        }
        Ok(conversation)
    }

    /// Parse, dedupe and check that every referenced user exists.
    async fn existing_users(&self, ids: &[String], exclude: i64) -> Result<Vec<i64>, ConversationError> {
        let mut seen = HashSet::new();
        let ids: Vec<i64> = ids
            .iter()
            .map(|id| parse_id(id))
            .filter(|id| *id != exclude && seen.insert(*id))
            .collect();

        let found = self.users.find_many(&ids).await?;
        if found.len() != ids.len() {
            return Err(ConversationError::UserNotFound);
        }
        Ok(ids)
    }

    async fn present(&self, conversation: Conversation, viewer_id: i64) -> Result<ConversationResponse, ConversationError> {
        let members = self.conversations.members(conversation.id).await?;
        let users = Authors::load(self.users.as_ref(), members.iter().map(|m| m.user_id)).await?;
        let members = members
            .iter()
            .map(|member| MemberResponse::new(member, users.get(member.user_id)))
            .collect();

        let latest = self.messages.latest(conversation.id).await?;
        let last_message = message_responses(
            self.users.as_ref(),
            self.messages.as_ref(),
            latest.into_iter().collect(),
        )
        .await?
        .pop();
        let unread_count = self.conversations.unread_count(conversation.id, viewer_id).await?;

        Ok(ConversationResponse::new(conversation, members, last_message, unread_count))
    }
}

#[async_trait]
impl ConversationService for ConversationServiceImpl {
    #[instrument(skip(self, request), fields(is_group = request.is_group))]
    async fn create(&self, user_id: i64, request: CreateConversationRequest) -> Result<CreatedConversation, ConversationError> {
        let participants = self.existing_users(&request.participant_ids, user_id).await?;
        if participants.is_empty() {
            return Err(ConversationError::NoParticipants);
        }

        if !request.is_group {
            let [other] = participants[..] else {
                return Err(ConversationError::DirectParticipants);
            };
            if let Some(existing) = self.conversations.find_direct(user_id, other).await? {
                return Ok(CreatedConversation {
                    conversation: self.present(existing, user_id).await?,
                    created: false,
                });
            }

            let conversation = Conversation::new(self.id_generator.generate(), ConversationKind::Direct, None, user_id);
            let members = [
                ConversationMember::new(conversation.id, user_id, MemberRole::Member),
                ConversationMember::new(conversation.id, other, MemberRole::Member),
            ];
            let conversation = self.conversations.create(&conversation, &members).await?;

            info!(conversation_id = conversation.id, user_id, other, "Direct conversation created");
            return Ok(CreatedConversation {
                conversation: self.present(conversation, user_id).await?,
                created: true,
            });
        }

        let name = request.name.filter(|n| !n.is_empty()).ok_or(ConversationError::NameRequired)?;
        let conversation = Conversation::new(self.id_generator.generate(), ConversationKind::Group, Some(name), user_id);

        let mut members = vec![ConversationMember::new(conversation.id, user_id, MemberRole::Admin)];
        members.extend(
            participants
                .iter()
                .map(|id| ConversationMember::new(conversation.id, *id, MemberRole::Member)),
        );
        let conversation = self.conversations.create(&conversation, &members).await?;

        info!(conversation_id = conversation.id, members = members.len(), "Group conversation created");
        Ok(CreatedConversation {
            conversation: self.present(conversation, user_id).await?,
            created: true,
        })
    }

    async fn list(&self, user_id: i64, pagination: Pagination) -> Result<Paginated<ConversationResponse>, ConversationError> {
        let page = self.conversations.find_for_user(user_id, pagination).await?;

        let mut items = Vec::with_capacity(page.items.len());
        for conversation in page.items {
            items.push(self.present(conversation, user_id).await?);
        }
        Ok(Paginated::new(Page::new(items, page.total), pagination))
    }

    async fn get(&self, user_id: i64, conversation_id: i64) -> Result<ConversationResponse, ConversationError> {
        let (conversation, _) = self.member_of(conversation_id, user_id).await?;
        self.present(conversation, user_id).await
    }

    #[instrument(skip(self, request))]
    async fn rename(
        &self,
        user_id: i64,
        conversation_id: i64,
        request: UpdateConversationRequest,
    ) -> Result<ConversationResponse, ConversationError> {
        let mut conversation = self.admin_of(conversation_id, user_id).await?;
        conversation.name = Some(request.name);

        let conversation = self.conversations.update(&conversation).await?;
        self.present(conversation, user_id).await
    }

    #[instrument(skip(self, request))]
    async fn add_members(
        &self,
        user_id: i64,
        conversation_id: i64,
        request: AddMembersRequest,
    ) -> Result<ConversationResponse, ConversationError> {
        let conversation = self.admin_of(conversation_id, user_id).await?;
        let ids = self.existing_users(&request.user_ids, user_id).await?;

        let members: Vec<ConversationMember> = ids
            .into_iter()
            .map(|id| ConversationMember::new(conversation_id, id, MemberRole::Member))
            .collect();
        self.conversations.add_members(&members).await?;

        info!(conversation_id, added = members.len(), "Members added");
        self.present(conversation, user_id).await
    }

    #[instrument(skip(self))]
    async fn remove_member(&self, user_id: i64, conversation_id: i64, member_id: i64) -> Result<(), ConversationError> {
        let (conversation, caller) = self.member_of(conversation_id, user_id).await?;
        if !conversation.is_group() {
            return Err(ConversationError::NotAGroup);
        }
        if member_id != user_id && !caller.is_admin() {
            return Err(ConversationError::AccessDenied);
        }

        if !self.conversations.remove_member(conversation_id, member_id).await? {
            return Err(ConversationError::MemberNotFound);
        }
        info!(conversation_id, member_id, "Member removed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, user_id: i64, conversation_id: i64) -> Result<(), ConversationError> {
        let (conversation, member) = self.member_of(conversation_id, user_id).await?;
        if conversation.is_group() && !member.is_admin() {
            return Err(ConversationError::AccessDenied);
        }

        if !self.conversations.delete(conversation_id).await? {
            return Err(ConversationError::NotFound);
        }
        info!(conversation_id, user_id, "Conversation deleted");
        Ok(())
    }

    async fn mark_read(&self, user_id: i64, conversation_id: i64) -> Result<(), ConversationError> {
        self.member_of(conversation_id, user_id).await?;
        self.conversations.mark_read(conversation_id, user_id, Utc::now()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, User};
    use crate::infrastructure::repositories::{MemoryStore, Repositories};
    use pretty_assertions::assert_eq;

    async fn setup() -> (ConversationServiceImpl, Repositories) {
        let repos = Repositories::in_memory(MemoryStore::new());
        for id in 1..=4 {
            let user = User::new(id, format!("user{id}"), format!("u{id}@example.com"), "hash".into());
            repos.users.create(&user).await.unwrap();
        }
        let service = ConversationServiceImpl::new(
            repos.users.clone(),
            repos.conversations.clone(),
            repos.messages.clone(),
            Arc::new(SnowflakeGenerator::new(1, 0)),
        );
        (service, repos)
    }

    fn direct(with: i64) -> CreateConversationRequest {
        CreateConversationRequest {
            participant_ids: vec![with.to_string()],
            name: None,
            is_group: false,
        }
    }

    fn group(name: &str, with: &[i64]) -> CreateConversationRequest {
        CreateConversationRequest {
            participant_ids: with.iter().map(|id| id.to_string()).collect(),
            name: Some(name.into()),
            is_group: true,
        }
    }

    fn id_of(response: &ConversationResponse) -> i64 {
        response.id.parse().unwrap()
    }

    #[tokio::test]
    async fn test_direct_conversation_is_unique_per_pair() {
        let (service, _) = setup().await;
        let first = service.create(1, direct(2)).await.unwrap();
        assert!(first.created);

        let again = service.create(2, direct(1)).await.unwrap();
        assert!(!again.created);
        assert_eq!(again.conversation.id, first.conversation.id);
    }

    #[tokio::test]
    async fn test_group_requires_name_and_creator_is_admin() {
        let (service, _) = setup().await;
        let mut request = group("", &[2, 3]);
        request.name = None;
        assert!(matches!(service.create(1, request).await, Err(ConversationError::NameRequired)));

        let created = service.create(1, group("crew", &[2, 3])).await.unwrap();
        let admin = created
            .conversation
            .members
            .iter()
            .find(|m| m.user.id == "1")
            .unwrap();
        assert_eq!(admin.role, "admin");
        assert_eq!(created.conversation.members.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_participant_rejected() {
        let (service, _) = setup().await;
        let err = service.create(1, direct(99)).await.unwrap_err();
        assert_eq!(AppError::from(err).code(), "USER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_only_admin_renames_and_adds() {
        let (service, _) = setup().await;
        let created = service.create(1, group("crew", &[2])).await.unwrap();
        let id = id_of(&created.conversation);

        let rename = || UpdateConversationRequest { name: "renamed".into() };
        assert!(matches!(service.rename(2, id, rename()).await, Err(ConversationError::AccessDenied)));
        assert_eq!(service.rename(1, id, rename()).await.unwrap().name.as_deref(), Some("renamed"));

        let add = AddMembersRequest { user_ids: vec!["4".into()] };
        assert_eq!(service.add_members(1, id, add).await.unwrap().members.len(), 3);
    }

    #[tokio::test]
    async fn test_member_can_leave_but_not_remove_others() {
        let (service, repos) = setup().await;
        let created = service.create(1, group("crew", &[2, 3])).await.unwrap();
        let id = id_of(&created.conversation);

        assert!(matches!(service.remove_member(2, id, 3).await, Err(ConversationError::AccessDenied)));
        service.remove_member(2, id, 2).await.unwrap();
        assert!(repos.conversations.find_member(id, 2).await.unwrap().is_none());

        let err = service.get(2, id).await.unwrap_err();
        assert_eq!(AppError::from(err).code(), "ACCESS_DENIED");
    }

    #[tokio::test]
    async fn test_any_member_deletes_direct_conversation() {
        let (service, repos) = setup().await;
        let created = service.create(1, direct(2)).await.unwrap();
        let id = id_of(&created.conversation);

        service.delete(2, id).await.unwrap();
        assert!(repos.conversations.find_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unread_count_cleared_by_mark_read() {
        let (service, repos) = setup().await;
        let created = service.create(1, direct(2)).await.unwrap();
        let id = id_of(&created.conversation);
        repos
            .messages
            .create(&Message::new(500, id, 1, "hi".into(), None))
            .await
            .unwrap();

        let seen_by_two = service.get(2, id).await.unwrap();
        assert_eq!(seen_by_two.unread_count, 1);
        assert_eq!(seen_by_two.last_message.unwrap().content, "hi");

        service.mark_read(2, id).await.unwrap();
        assert_eq!(service.get(2, id).await.unwrap().unread_count, 0);
    }
}
