//! In-memory repositories.
//!
//! Every repository shares one [`MemoryStore`]; a single write lock spans
//! each join-row mutation and its counter delta, which gives the same
//! atomicity the PostgreSQL repositories get from transactions. Cascading
//! deletes mirror the `ON DELETE CASCADE` rules of the schema.
//!
//! Used by the test-suite and for single-instance runs with
//! `storage.backend = "memory"`.

mod comment;
mod conversation;
mod follow;
mod hashtag;
mod message;
mod post;
mod story;
mod user;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::{
    Comment, Conversation, ConversationMember, Follow, Hashtag, Message, Post, Reaction, Story,
    StoryView, User,
};

pub use comment::MemoryCommentRepository;
pub use conversation::MemoryConversationRepository;
pub use follow::MemoryFollowRepository;
pub use hashtag::MemoryHashtagRepository;
pub use message::MemoryMessageRepository;
pub use post::MemoryPostRepository;
pub use story::MemoryStoryRepository;
pub use user::MemoryUserRepository;

/// All tables of the in-memory backend.
#[derive(Default)]
pub(crate) struct Tables {
    pub users: HashMap<i64, User>,
    /// Keyed by `(follower_id, following_id)`
    pub follows: HashMap<(i64, i64), Follow>,
    pub posts: HashMap<i64, Post>,
    /// Keyed by `(post_id, user_id)`
    pub likes: HashMap<(i64, i64), DateTime<Utc>>,
    /// Keyed by name
    pub hashtags: HashMap<String, Hashtag>,
    /// `(post_id, hashtag name)`
    pub post_hashtags: HashSet<(i64, String)>,
    pub next_hashtag_id: i64,
    pub comments: HashMap<i64, Comment>,
    /// `(comment_id, user_id)`
    pub comment_likes: HashSet<(i64, i64)>,
    pub conversations: HashMap<i64, Conversation>,
    /// Keyed by `(conversation_id, user_id)`
    pub members: HashMap<(i64, i64), ConversationMember>,
    pub messages: HashMap<i64, Message>,
    pub reactions: Vec<Reaction>,
    pub stories: HashMap<i64, Story>,
    /// Keyed by `(story_id, viewer_id)`
    pub story_views: HashMap<(i64, i64), StoryView>,
}

impl Tables {
    /// Remove a comment with its replies and likes, returning the removed rows.
    pub fn remove_comment_tree(&mut self, id: i64) -> Vec<Comment> {
        let mut removed = Vec::new();
        if let Some(comment) = self.comments.remove(&id) {
            let reply_ids: Vec<i64> = self
                .comments
                .values()
                .filter(|c| c.parent_id == Some(id))
                .map(|c| c.id)
                .collect();
            removed.push(comment);
            for reply_id in reply_ids {
                if let Some(reply) = self.comments.remove(&reply_id) {
                    removed.push(reply);
                }
            }
        }
        let removed_ids: HashSet<i64> = removed.iter().map(|c| c.id).collect();
        self.comment_likes.retain(|(comment_id, _)| !removed_ids.contains(comment_id));
        removed
    }

    /// Unlink every hashtag of a post, decrementing `posts_count`.
    pub fn unlink_hashtags(&mut self, post_id: i64) {
        let names: Vec<String> = self
            .post_hashtags
            .iter()
            .filter(|(p, _)| *p == post_id)
            .map(|(_, name)| name.clone())
            .collect();
        for name in names {
            self.post_hashtags.remove(&(post_id, name.clone()));
            if let Some(tag) = self.hashtags.get_mut(&name) {
                tag.posts_count -= 1;
            }
        }
    }

    /// Link hashtags to a post, creating missing ones.
    pub fn link_hashtags(&mut self, post_id: i64, names: &[String]) {
        for name in names {
            if !self.hashtags.contains_key(name) {
                self.next_hashtag_id += 1;
                self.hashtags.insert(
                    name.clone(),
                    Hashtag {
                        id: self.next_hashtag_id,
                        name: name.clone(),
                        posts_count: 0,
                        created_at: Utc::now(),
                    },
                );
            }
            if self.post_hashtags.insert((post_id, name.clone())) {
                if let Some(tag) = self.hashtags.get_mut(name) {
                    tag.posts_count += 1;
                }
            }
        }
    }

    /// Remove a message and its reactions; replies keep existing with a
    /// cleared `reply_to_id`.
    pub fn remove_message(&mut self, id: i64) -> bool {
        if self.messages.remove(&id).is_none() {
            return false;
        }
        self.reactions.retain(|r| r.message_id != id);
        for message in self.messages.values_mut() {
            if message.reply_to_id == Some(id) {
                message.reply_to_id = None;
            }
        }
        true
    }

    pub fn user_is_private(&self, user_id: i64) -> bool {
        self.users.get(&user_id).is_some_and(|u| u.is_private)
    }
}

/// Shared handle to the in-memory tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn tables(&self) -> &RwLock<Tables> {
        &self.tables
    }
}

/// Newest first, ties broken by id.
pub(crate) fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

/// Oldest first, ties broken by id.
pub(crate) fn oldest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i64)) {
    items.sort_by_key(key);
}
