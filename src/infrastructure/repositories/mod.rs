//! Repository Implementations
//!
//! Concrete implementations of the repository traits defined in the domain
//! layer: PostgreSQL (`Pg*`) and in-memory (`memory::Memory*`).
//!
//! ## Available Repositories
//!
//! - **UserRepository** - Accounts and profile search
//! - **FollowRepository** - Follow edges and follow requests
//! - **PostRepository** - Posts, media, likes and hashtag links
//! - **CommentRepository** - Comments, replies and comment likes
//! - **ConversationRepository** - Conversations and membership
//! - **MessageRepository** - Messages and reactions
//! - **StoryRepository** - Stories and story views
//! - **HashtagRepository** - Trending and prefix search
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use social_api::infrastructure::repositories::Repositories;
//!
//! let repos = Repositories::postgres(pool.clone());
//! let user = repos.users.find_by_id(42).await?;
//! ```

pub mod comment_repository;
pub mod conversation_repository;
pub mod follow_repository;
pub mod hashtag_repository;
pub mod memory;
pub mod message_repository;
pub mod post_repository;
pub mod story_repository;
pub mod user_repository;

use std::sync::Arc;

use sqlx::PgPool;

use crate::domain::{
    CommentRepository, ConversationRepository, FollowRepository, HashtagRepository,
    MessageRepository, PostRepository, StoryRepository, UserRepository,
};

pub use comment_repository::PgCommentRepository;
pub use conversation_repository::PgConversationRepository;
pub use follow_repository::PgFollowRepository;
pub use hashtag_repository::PgHashtagRepository;
pub use memory::MemoryStore;
pub use message_repository::PgMessageRepository;
pub use post_repository::PgPostRepository;
pub use story_repository::PgStoryRepository;
pub use user_repository::PgUserRepository;

/// One handle per repository trait, shared by every request.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub stories: Arc<dyn StoryRepository>,
    pub hashtags: Arc<dyn HashtagRepository>,
}

impl Repositories {
    /// PostgreSQL-backed repositories sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            follows: Arc::new(PgFollowRepository::new(pool.clone())),
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            comments: Arc::new(PgCommentRepository::new(pool.clone())),
            conversations: Arc::new(PgConversationRepository::new(pool.clone())),
            messages: Arc::new(PgMessageRepository::new(pool.clone())),
            stories: Arc::new(PgStoryRepository::new(pool.clone())),
            hashtags: Arc::new(PgHashtagRepository::new(pool)),
        }
    }

    /// In-memory repositories sharing one store.
    pub fn in_memory(store: MemoryStore) -> Self {
        Self {
            users: Arc::new(memory::MemoryUserRepository::new(store.clone())),
            follows: Arc::new(memory::MemoryFollowRepository::new(store.clone())),
            posts: Arc::new(memory::MemoryPostRepository::new(store.clone())),
            comments: Arc::new(memory::MemoryCommentRepository::new(store.clone())),
            conversations: Arc::new(memory::MemoryConversationRepository::new(store.clone())),
            messages: Arc::new(memory::MemoryMessageRepository::new(store.clone())),
            stories: Arc::new(memory::MemoryStoryRepository::new(store.clone())),
            hashtags: Arc::new(memory::MemoryHashtagRepository::new(store)),
        }
    }
}
