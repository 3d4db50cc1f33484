//! Response DTOs
//!
//! Data structures placed in the `data` field of the response envelope.
//! Field names are camelCase and ids are serialised as strings.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    Comment, Conversation, ConversationMember, FollowStatus, Hashtag, Media, MediaKind, Message,
    Page, PageMeta, Pagination, Post, Reaction, Story, User,
};

/// A page of items plus `{total, page, limit, pages}`.
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: PageMeta,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(page: Page<T>, pagination: Pagination) -> Self {
        Self {
            pagination: PageMeta::new(pagination, page.total),
            items: page.items,
        }
    }
}

// ============================================================================
// Auth
// ============================================================================

/// Access/refresh token pair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub token_type: String,
}

/// Registration and login response (includes user and tokens)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: TokenResponse,
}

// ============================================================================
// Users
// ============================================================================

/// Full user record; `email` only for the user themselves.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub avatar_url: Option<String>,
    pub is_private: bool,
    pub is_verified: bool,
    pub posts_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn from_user(user: User, include_email: bool) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username,
            email: include_email.then_some(user.email),
            full_name: user.full_name,
            bio: user.bio,
            website: user.website,
            avatar_url: user.avatar_url,
            is_private: user.is_private,
            is_verified: user.is_verified,
            posts_count: user.posts_count,
            followers_count: user.followers_count,
            following_count: user.following_count,
            created_at: user.created_at,
        }
    }
}

/// Profile as seen by a viewer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub is_own_profile: bool,
    pub is_following: bool,
    /// `pending` or `accepted` when the viewer has a follow edge
    pub follow_status: Option<FollowStatus>,
}

/// Compact author block embedded in posts, comments and messages.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            avatar_url: user.avatar_url.clone(),
            is_verified: user.is_verified,
        }
    }
}

impl UserSummary {
    /// Placeholder for an author row that no longer resolves.
    pub fn unknown(id: i64) -> Self {
        Self {
            id: id.to_string(),
            username: String::from("[deleted]"),
            full_name: None,
            avatar_url: None,
            is_verified: false,
        }
    }
}

/// Result of a follow request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub status: FollowStatus,
}

// ============================================================================
// Posts
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaResponse {
    pub id: String,
    pub url: String,
    pub kind: MediaKind,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub position: i32,
}

impl From<Media> for MediaResponse {
    fn from(media: Media) -> Self {
        Self {
            id: media.id.to_string(),
            url: media.url,
            kind: media.kind,
            width: media.width,
            height: media.height,
            position: media.position,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub user: UserSummary,
    pub caption: Option<String>,
    pub location: Option<String>,
    pub media: Vec<MediaResponse>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub likes_enabled: bool,
    pub comments_enabled: bool,
    pub is_archived: bool,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostResponse {
    pub fn new(post: Post, author: UserSummary, is_liked: bool) -> Self {
        Self {
            id: post.id.to_string(),
            user: author,
            caption: post.caption,
            location: post.location,
            media: post.media.into_iter().map(Into::into).collect(),
            likes_count: post.likes_count,
            comments_count: post.comments_count,
            likes_enabled: post.likes_enabled,
            comments_enabled: post.comments_enabled,
            is_archived: post.is_archived,
            is_liked,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// Counter state returned after a like toggle.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub liked: bool,
    pub likes_count: i64,
}

// ============================================================================
// Comments
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub user: UserSummary,
    pub content: String,
    pub likes_count: i64,
    pub replies_count: i64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentResponse {
    pub fn new(comment: Comment, author: UserSummary, is_liked: bool) -> Self {
        Self {
            id: comment.id.to_string(),
            post_id: comment.post_id.to_string(),
            parent_id: comment.parent_id.map(|id| id.to_string()),
            user: author,
            content: comment.content,
            likes_count: comment.likes_count,
            replies_count: comment.replies_count,
            is_liked,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

// ============================================================================
// Conversations & messages
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub user: UserSummary,
    pub role: &'static str,
    pub joined_at: DateTime<Utc>,
}

impl MemberResponse {
    pub fn new(member: &ConversationMember, user: UserSummary) -> Self {
        Self {
            user,
            role: member.role.as_str(),
            joined_at: member.joined_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionResponse {
    pub user_id: String,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

impl From<Reaction> for ReactionResponse {
    fn from(reaction: Reaction) -> Self {
        Self {
            user_id: reaction.user_id.to_string(),
            emoji: reaction.emoji,
            created_at: reaction.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub conversation_id: String,
    pub sender: UserSummary,
    pub content: String,
    pub reply_to_id: Option<String>,
    pub reactions: Vec<ReactionResponse>,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MessageResponse {
    pub fn new(message: Message, sender: UserSummary, reactions: Vec<Reaction>) -> Self {
        Self {
            id: message.id.to_string(),
            conversation_id: message.conversation_id.to_string(),
            sender,
            content: message.content,
            reply_to_id: message.reply_to_id.map(|id| id.to_string()),
            reactions: reactions.into_iter().map(Into::into).collect(),
            edited_at: message.edited_at,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub id: String,
    pub is_group: bool,
    pub name: Option<String>,
    pub created_by: String,
    pub members: Vec<MemberResponse>,
    pub last_message: Option<MessageResponse>,
    pub unread_count: i64,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ConversationResponse {
    pub fn new(
        conversation: Conversation,
        members: Vec<MemberResponse>,
        last_message: Option<MessageResponse>,
        unread_count: i64,
    ) -> Self {
        Self {
            id: conversation.id.to_string(),
            is_group: conversation.is_group(),
            name: conversation.name,
            created_by: conversation.created_by.to_string(),
            members,
            last_message,
            unread_count,
            last_message_at: conversation.last_message_at,
            created_at: conversation.created_at,
        }
    }
}

// ============================================================================
// Stories
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResponse {
    pub id: String,
    pub user_id: String,
    pub media_url: String,
    pub media_kind: MediaKind,
    pub caption: Option<String>,
    pub views_count: i64,
    pub viewed: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl StoryResponse {
    pub fn new(story: Story, viewed: bool) -> Self {
        Self {
            id: story.id.to_string(),
            user_id: story.user_id.to_string(),
            media_url: story.media_url,
            media_kind: story.media_kind,
            caption: story.caption,
            views_count: story.views_count,
            viewed,
            expires_at: story.expires_at,
            created_at: story.created_at,
        }
    }
}

/// One user's active stories in the story tray.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryGroupResponse {
    pub user: UserSummary,
    pub stories: Vec<StoryResponse>,
    pub has_unviewed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryViewerResponse {
    pub user: UserSummary,
    pub viewed_at: DateTime<Utc>,
}

// ============================================================================
// Hashtags
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HashtagResponse {
    pub id: String,
    pub name: String,
    pub posts_count: i64,
}

impl From<Hashtag> for HashtagResponse {
    fn from(tag: Hashtag) -> Self {
        Self {
            id: tag.id.to_string(),
            name: tag.name,
            posts_count: tag.posts_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_user_response_hides_email_for_others() {
        let user = User::new(7, "alice".into(), "a@example.com".into(), "hash".into());
        let json = serde_json::to_value(UserResponse::from_user(user.clone(), false)).unwrap();
        assert!(json.get("email").is_none());
        assert_eq!(json["id"], "7");
        assert_eq!(json["postsCount"], 0);

        let json = serde_json::to_value(UserResponse::from_user(user, true)).unwrap();
        assert_eq!(json["email"], "a@example.com");
    }

    #[test]
    fn test_paginated_shape() {
        let pagination = Pagination::new(2, 10);
        let page = Page::new(vec![1, 2, 3, 4, 5], 15);
        let json = serde_json::to_value(Paginated::new(page, pagination)).unwrap();
        assert_eq!(json["items"].as_array().unwrap().len(), 5);
        assert_eq!(json["pagination"]["pages"], 2);
        assert_eq!(json["pagination"]["total"], 15);
    }

    #[test]
    fn test_auth_response_flattens_tokens() {
        let user = User::new(1, "bob".into(), "b@example.com".into(), "hash".into());
        let response = AuthResponse {
            user: UserResponse::from_user(user, true),
            tokens: TokenResponse {
                access_token: "a".into(),
                refresh_token: "r".into(),
                expires_in: 900,
                token_type: "Bearer".into(),
            },
        };
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["accessToken"], "a");
        assert_eq!(json["user"]["username"], "bob");
    }
}
