//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **AuthService**: Registration, login, JWT tokens, revocation, passwords
//! - **UserService**: Profiles, avatars, search and the follow graph
//! - **PostService**: Posts, media uploads, feeds, archive state and likes
//! - **CommentService**: Comments, replies and comment likes
//! - **ConversationService**: Direct and group conversations
//! - **MessageService**: Messages and reactions
//! - **StoryService**: Stories, views and expiry
//! - **HashtagService**: Trending hashtags and hashtag pages

pub mod auth_service;
pub mod comment_service;
pub mod conversation_service;
pub mod hashtag_service;
pub mod message_service;
pub mod post_service;
pub mod story_service;
pub mod user_service;

mod support;

use std::sync::Arc;

use crate::config::Settings;
use crate::infrastructure::cache::TokenRevocationList;
use crate::infrastructure::media::MediaStore;
use crate::infrastructure::repositories::Repositories;
use crate::shared::snowflake::SnowflakeGenerator;

// Re-export service types
pub use auth_service::{AuthError, AuthService, AuthServiceImpl, Claims, TokenType};
pub use comment_service::{CommentError, CommentService, CommentServiceImpl};
pub use conversation_service::{
    ConversationError, ConversationService, ConversationServiceImpl, CreatedConversation,
};
pub use hashtag_service::{HashtagError, HashtagService, HashtagServiceImpl};
pub use message_service::{MessageError, MessageService, MessageServiceImpl};
pub use post_service::{PostError, PostService, PostServiceImpl};
pub use story_service::{StoryError, StoryService, StoryServiceImpl};
pub use user_service::{UserError, UserService, UserServiceImpl};

/// Every service behind its trait object, shared by all handlers.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<dyn AuthService>,
    pub users: Arc<dyn UserService>,
    pub posts: Arc<dyn PostService>,
    pub comments: Arc<dyn CommentService>,
    pub conversations: Arc<dyn ConversationService>,
    pub messages: Arc<dyn MessageService>,
    pub stories: Arc<dyn StoryService>,
    pub hashtags: Arc<dyn HashtagService>,
}

impl Services {
    pub fn new(
        settings: &Settings,
        repos: &Repositories,
        media: Arc<dyn MediaStore>,
        revocations: Arc<dyn TokenRevocationList>,
    ) -> Self {
        let id_generator = Arc::new(SnowflakeGenerator::with_epoch(
            settings.snowflake.epoch,
            settings.snowflake.machine_id as u64,
            0,
        ));

        Self {
            auth: Arc::new(AuthServiceImpl::new(
                repos.users.clone(),
                revocations,
                id_generator.clone(),
                settings.jwt.clone(),
            )),
            users: Arc::new(UserServiceImpl::new(
                repos.users.clone(),
                repos.follows.clone(),
                media.clone(),
                settings.media.clone(),
            )),
            posts: Arc::new(PostServiceImpl::new(
                repos.users.clone(),
                repos.follows.clone(),
                repos.posts.clone(),
                media.clone(),
                id_generator.clone(),
                settings.media.clone(),
            )),
            comments: Arc::new(CommentServiceImpl::new(
                repos.users.clone(),
                repos.follows.clone(),
                repos.posts.clone(),
                repos.comments.clone(),
                id_generator.clone(),
            )),
            conversations: Arc::new(ConversationServiceImpl::new(
                repos.users.clone(),
                repos.conversations.clone(),
                repos.messages.clone(),
                id_generator.clone(),
            )),
            messages: Arc::new(MessageServiceImpl::new(
                repos.users.clone(),
                repos.conversations.clone(),
                repos.messages.clone(),
                id_generator.clone(),
            )),
            stories: Arc::new(StoryServiceImpl::new(
                repos.users.clone(),
                repos.follows.clone(),
                repos.stories.clone(),
                media,
                id_generator,
                settings.media.clone(),
                settings.stories.clone(),
            )),
            hashtags: Arc::new(HashtagServiceImpl::new(
                repos.users.clone(),
                repos.posts.clone(),
                repos.hashtags.clone(),
            )),
        }
    }
}
