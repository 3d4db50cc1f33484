//! # Domain Entities
//!
//! Core domain entities representing the main business objects of the social
//! API. All entities map directly to their corresponding database tables.
//!
//! ## Core Entities
//!
//! - **User**: Account with credentials, profile and denormalised counters
//! - **Follow**: Directed follow edge, pending for private accounts
//! - **Post**: A post with ordered media items, likes and hashtag links
//! - **Comment**: Comment on a post with one level of replies
//! - **Conversation**: Direct or group conversation with its members
//! - **Message**: Message inside a conversation, with emoji reactions
//! - **Story**: Ephemeral media item with per-viewer view tracking
//! - **Hashtag**: Lowercased tag extracted from post captions
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer (PostgreSQL and
//! in-memory), following the dependency inversion principle.

mod comment;
mod conversation;
mod follow;
mod hashtag;
mod message;
mod post;
mod story;
mod user;

pub use comment::{Comment, CommentRepository};
pub use conversation::{
    Conversation, ConversationKind, ConversationMember, ConversationRepository, MemberRole,
};
pub use follow::{Follow, FollowRepository, FollowStatus};
pub use hashtag::{extract_hashtags, normalize_hashtag, Hashtag, HashtagRepository, MAX_HASHTAG_LEN};
pub use message::{Message, MessageRepository, Reaction};
pub use post::{Media, MediaKind, Post, PostRepository};
pub use story::{Story, StoryRepository, StoryView};
pub use user::{User, UserRepository};

#[cfg(test)]
pub use follow::MockFollowRepository;
