use async_trait::async_trait;
use chrono::Utc;

use super::{oldest_first, MemoryStore, Tables};
use crate::domain::{Comment, CommentRepository, Page, Pagination};
use crate::shared::error::AppError;

pub struct MemoryCommentRepository {
    store: MemoryStore,
}

impl MemoryCommentRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    /// A copy of the comment with `replies_count` filled in.
    fn hydrate(tables: &Tables, comment: &Comment) -> Comment {
        let mut comment = comment.clone();
        comment.replies_count = tables
            .comments
            .values()
            .filter(|c| c.parent_id == Some(comment.id))
            .count() as i64;
        comment
    }

    fn select(&self, pagination: Pagination, filter: impl Fn(&Comment) -> bool) -> Page<Comment> {
        let tables = self.store.tables().read();
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| filter(c))
            .map(|c| Self::hydrate(&tables, c))
            .collect();
        oldest_first(&mut comments, |c| (c.created_at, c.id));
        Page::from_vec(comments, pagination)
    }
}

#[async_trait]
impl CommentRepository for MemoryCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment, AppError> {
        let mut tables = self.store.tables().write();
        let Some(post) = tables.posts.get_mut(&comment.post_id) else {
            return Err(AppError::not_found("POST_NOT_FOUND", "Post not found"));
        };
        post.comments_count += 1;
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, AppError> {
        let tables = self.store.tables().read();
        Ok(tables.comments.get(&id).map(|c| Self::hydrate(&tables, c)))
    }

    async fn update(&self, comment: &Comment) -> Result<Comment, AppError> {
        let mut tables = self.store.tables().write();
        let stored = tables
            .comments
            .get_mut(&comment.id)
            .ok_or_else(|| AppError::not_found("COMMENT_NOT_FOUND", "Comment not found"))?;
        stored.content = comment.content.clone();
        stored.updated_at = Utc::now();
        let stored = stored.clone();
        Ok(Self::hydrate(&tables, &stored))
    }

    async fn delete(&self, id: i64) -> Result<i64, AppError> {
        let mut tables = self.store.tables().write();
        let removed = tables.remove_comment_tree(id);
        let count = removed.len() as i64;
        if let Some(post_id) = removed.first().map(|c| c.post_id) {
            if let Some(post) = tables.posts.get_mut(&post_id) {
                post.comments_count -= count;
            }
        }
        Ok(count)
    }

    async fn find_by_post(&self, post_id: i64, pagination: Pagination) -> Result<Page<Comment>, AppError> {
        Ok(self.select(pagination, |c| c.post_id == post_id && c.parent_id.is_none()))
    }

    async fn replies(&self, parent_id: i64, pagination: Pagination) -> Result<Page<Comment>, AppError> {
        Ok(self.select(pagination, |c| c.parent_id == Some(parent_id)))
    }

    async fn add_like(&self, comment_id: i64, user_id: i64) -> Result<bool, AppError> {
        let mut tables = self.store.tables().write();
        if tables.comment_likes.contains(&(comment_id, user_id)) {
            return Ok(false);
        }
        let Some(comment) = tables.comments.get_mut(&comment_id) else {
            return Err(AppError::not_found("COMMENT_NOT_FOUND", "Comment not found"));
        };
        comment.likes_count += 1;
        tables.comment_likes.insert((comment_id, user_id));
        Ok(true)
    }

    async fn remove_like(&self, comment_id: i64, user_id: i64) -> Result<bool, AppError> {
        let mut tables = self.store.tables().write();
        if !tables.comment_likes.remove(&(comment_id, user_id)) {
            return Ok(false);
        }
        if let Some(comment) = tables.comments.get_mut(&comment_id) {
            comment.likes_count -= 1;
        }
        Ok(true)
    }

    async fn liked_comment_ids(&self, user_id: i64, comment_ids: &[i64]) -> Result<Vec<i64>, AppError> {
        let tables = self.store.tables().read();
        Ok(comment_ids
            .iter()
            .copied()
            .filter(|id| tables.comment_likes.contains(&(*id, user_id)))
            .collect())
    }
}
