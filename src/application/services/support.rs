//! Helpers shared by the application services.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::application::dto::response::{MessageResponse, Paginated, PostResponse, UserSummary};
use crate::domain::{
    Conversation, ConversationMember, ConversationRepository, FollowRepository, Message,
    MessageRepository, Page, Pagination, Post, PostRepository, Reaction, User, UserRepository,
    VisibilityService,
};
use crate::infrastructure::media::MediaStore;
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Author lookups for a batch of rows.
pub(crate) struct Authors(HashMap<i64, UserSummary>);

impl Authors {
    pub(crate) async fn load(
        users: &dyn UserRepository,
        ids: impl IntoIterator<Item = i64>,
    ) -> Result<Self, AppError> {
        let ids: Vec<i64> = ids.into_iter().collect::<HashSet<_>>().into_iter().collect();
        let found = users.find_many(&ids).await?;
        Ok(Self(
            found.iter().map(|u| (u.id, UserSummary::from(u))).collect(),
        ))
    }

    pub(crate) fn get(&self, id: i64) -> UserSummary {
        self.0.get(&id).cloned().unwrap_or_else(|| UserSummary::unknown(id))
    }
}

/// A post the viewer may see, with its author.
///
/// Archived posts only exist for their owner; everyone else gets
/// `POST_NOT_FOUND`.
pub(crate) async fn visible_post(
    posts: &dyn PostRepository,
    users: &dyn UserRepository,
    follows: &dyn FollowRepository,
    post_id: i64,
    viewer_id: Option<i64>,
) -> Result<(Post, User), AppError> {
    let not_found = || AppError::not_found("POST_NOT_FOUND", "Post not found");

    let post = posts.find_by_id(post_id).await?.ok_or_else(not_found)?;
    if post.is_archived && viewer_id != Some(post.user_id) {
        return Err(not_found());
    }
    let author = users.find_by_id(post.user_id).await?.ok_or_else(not_found)?;
    VisibilityService::ensure_can_view(&author, viewer_id, follows).await?;

    Ok((post, author))
}

/// Attach authors and the viewer's like state to a batch of posts.
pub(crate) async fn post_responses(
    users: &dyn UserRepository,
    posts: &dyn PostRepository,
    batch: Vec<Post>,
    viewer_id: Option<i64>,
) -> Result<Vec<PostResponse>, AppError> {
    let authors = Authors::load(users, batch.iter().map(|p| p.user_id)).await?;
    let liked: HashSet<i64> = match viewer_id {
        Some(viewer) if !batch.is_empty() => {
            let ids: Vec<i64> = batch.iter().map(|p| p.id).collect();
            posts.liked_post_ids(viewer, &ids).await?.into_iter().collect()
        }
        _ => HashSet::new(),
    };

    Ok(batch
        .into_iter()
        .map(|post| {
            let author = authors.get(post.user_id);
            let is_liked = liked.contains(&post.id);
            PostResponse::new(post, author, is_liked)
        })
        .collect())
}

/// [`post_responses`] for a whole page.
pub(crate) async fn post_page(
    users: &dyn UserRepository,
    posts: &dyn PostRepository,
    page: Page<Post>,
    viewer_id: Option<i64>,
    pagination: Pagination,
) -> Result<Paginated<PostResponse>, AppError> {
    let total = page.total;
    let items = post_responses(users, posts, page.items, viewer_id).await?;
    Ok(Paginated::new(Page::new(items, total), pagination))
}

/// A conversation and the caller's membership in it. Non-members get
/// `ACCESS_DENIED`.
pub(crate) async fn membership(
    conversations: &dyn ConversationRepository,
    conversation_id: i64,
    user_id: i64,
) -> Result<(Conversation, ConversationMember), AppError> {
    let conversation = conversations
        .find_by_id(conversation_id)
        .await?
        .ok_or_else(|| AppError::not_found("CONVERSATION_NOT_FOUND", "Conversation not found"))?;
    let member = conversations
        .find_member(conversation_id, user_id)
        .await?
        .ok_or_else(AppError::access_denied)?;
    Ok((conversation, member))
}

/// Attach senders and reactions to a batch of messages.
pub(crate) async fn message_responses(
    users: &dyn UserRepository,
    messages: &dyn MessageRepository,
    batch: Vec<Message>,
) -> Result<Vec<MessageResponse>, AppError> {
    if batch.is_empty() {
        return Ok(Vec::new());
    }
    let senders = Authors::load(users, batch.iter().map(|m| m.sender_id)).await?;
    let ids: Vec<i64> = batch.iter().map(|m| m.id).collect();

    let mut reactions: HashMap<i64, Vec<Reaction>> = HashMap::new();
    for reaction in messages.reactions(&ids).await? {
        reactions.entry(reaction.message_id).or_default().push(reaction);
    }

    Ok(batch
        .into_iter()
        .map(|message| {
            let sender = senders.get(message.sender_id);
            let reactions = reactions.remove(&message.id).unwrap_or_default();
            MessageResponse::new(message, sender, reactions)
        })
        .collect())
}

/// Remove media after the owning row is gone. Failures are logged and
/// counted; the caller's operation has already succeeded.
pub(crate) async fn delete_media_best_effort(media: &dyn MediaStore, urls: &[String]) {
    for url in urls {
        if let Err(e) = media.delete(url).await {
            metrics::record_media_delete_failure();
            warn!(url = %url, error = %e, "Failed to delete media, continuing");
        }
    }
}
