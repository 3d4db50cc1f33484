//! Comment Service
//!
//! Comments and one level of replies on posts, plus comment likes.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use super::support::{visible_post, Authors};
use crate::application::dto::request::{parse_id, CreateCommentRequest, UpdateCommentRequest};
use crate::application::dto::response::{CommentResponse, LikeResponse, Paginated};
use crate::domain::{
    Comment, CommentRepository, FollowRepository, Page, Pagination, PostRepository, UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

#[async_trait]
pub trait CommentService: Send + Sync {
    async fn create(&self, user_id: i64, post_id: i64, request: CreateCommentRequest) -> Result<CommentResponse, CommentError>;

    /// Top-level comments of a post, oldest first
    async fn list(
        &self,
        post_id: i64,
        viewer_id: Option<i64>,
        pagination: Pagination,
    ) -> Result<Paginated<CommentResponse>, CommentError>;

    async fn replies(
        &self,
        comment_id: i64,
        viewer_id: Option<i64>,
        pagination: Pagination,
    ) -> Result<Paginated<CommentResponse>, CommentError>;

    async fn update(&self, user_id: i64, comment_id: i64, request: UpdateCommentRequest) -> Result<CommentResponse, CommentError>;

    /// Author or post owner; replies go with their parent
    async fn delete(&self, user_id: i64, comment_id: i64) -> Result<(), CommentError>;

    async fn like(&self, user_id: i64, comment_id: i64) -> Result<LikeResponse, CommentError>;

    async fn unlike(&self, user_id: i64, comment_id: i64) -> Result<LikeResponse, CommentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CommentError {
    #[error("Comment not found")]
    NotFound,

    #[error("Parent comment not found")]
    ParentNotFound,

    #[error("Replies can only be added to top-level comments")]
    NestedReply,

    #[error("Comments are disabled for this post")]
    CommentsDisabled,

    #[error("Access denied")]
    AccessDenied,

    #[error("Comment already liked")]
    AlreadyLiked,

    #[error("Comment not liked")]
    NotLiked,

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<CommentError> for AppError {
    fn from(err: CommentError) -> Self {
        let message = err.to_string();
        match err {
            CommentError::NotFound => AppError::not_found("COMMENT_NOT_FOUND", message),
            CommentError::ParentNotFound => AppError::not_found("PARENT_COMMENT_NOT_FOUND", message),
            CommentError::NestedReply => AppError::bad_request("NESTED_REPLY", message),
            CommentError::CommentsDisabled => AppError::bad_request("COMMENTS_DISABLED", message),
            CommentError::AccessDenied => AppError::access_denied(),
            CommentError::AlreadyLiked => AppError::bad_request("ALREADY_LIKED", message),
            CommentError::NotLiked => AppError::bad_request("NOT_LIKED", message),
            CommentError::App(e) => e,
        }
    }
}

pub struct CommentServiceImpl {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl CommentServiceImpl {
    pub fn new(
        users: Arc<dyn UserRepository>,
        follows: Arc<dyn FollowRepository>,
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            users,
            follows,
            posts,
            comments,
            id_generator,
        }
    }

    async fn find(&self, comment_id: i64) -> Result<Comment, CommentError> {
        self.comments
            .find_by_id(comment_id)
            .await?
            .ok_or(CommentError::NotFound)
    }

    /// Check the viewer may see the post the comment belongs to.
    async fn ensure_post_visible(&self, post_id: i64, viewer_id: Option<i64>) -> Result<(), CommentError> {
        visible_post(
            self.posts.as_ref(),
            self.users.as_ref(),
            self.follows.as_ref(),
            post_id,
            viewer_id,
        )
        .await?;
        Ok(())
    }

    async fn present(
        &self,
        comments: Vec<Comment>,
        viewer_id: Option<i64>,
    ) -> Result<Vec<CommentResponse>, CommentError> {
        let authors = Authors::load(self.users.as_ref(), comments.iter().map(|c| c.user_id)).await?;
        let liked: HashSet<i64> = match viewer_id {
            Some(viewer) if !comments.is_empty() => {
                let ids: Vec<i64> = comments.iter().map(|c| c.id).collect();
                self.comments
                    .liked_comment_ids(viewer, &ids)
                    .await?
                    .into_iter()
                    .collect()
            }
            _ => HashSet::new(),
        };

        Ok(comments
            .into_iter()
            .map(|comment| {
                let author = authors.get(comment.user_id);
                let is_liked = liked.contains(&comment.id);
                CommentResponse::new(comment, author, is_liked)
            })
            .collect())
    }

    async fn present_page(
        &self,
        page: Page<Comment>,
        viewer_id: Option<i64>,
        pagination: Pagination,
    ) -> Result<Paginated<CommentResponse>, CommentError> {
        let total = page.total;
        let items = self.present(page.items, viewer_id).await?;
        Ok(Paginated::new(Page::new(items, total), pagination))
    }

    async fn present_one(&self, comment: Comment, viewer_id: i64) -> Result<CommentResponse, CommentError> {
        self.present(vec![comment], Some(viewer_id))
            .await?
            .pop()
            .ok_or(CommentError::NotFound)
    }

    async fn likes_count(&self, comment_id: i64) -> Result<i64, CommentError> {
        Ok(self
            .comments
            .find_by_id(comment_id)
            .await?
            .map(|c| c.likes_count)
            .unwrap_or_default())
    }
}

#[async_trait]
impl CommentService for CommentServiceImpl {
    #[instrument(skip(self, request))]
    async fn create(&self, user_id: i64, post_id: i64, request: CreateCommentRequest) -> Result<CommentResponse, CommentError> {
        let (post, _) = visible_post(
            self.posts.as_ref(),
            self.users.as_ref(),
            self.follows.as_ref(),
            post_id,
            Some(user_id),
        )
        .await?;
        if !post.comments_enabled {
            return Err(CommentError::CommentsDisabled);
        }

        let parent_id = request.parent_id.as_deref().map(parse_id);
        if let Some(parent_id) = parent_id {
            let parent = self
                .comments
                .find_by_id(parent_id)
                .await?
                .filter(|p| p.post_id == post_id)
                .ok_or(CommentError::ParentNotFound)?;
            if parent.is_reply() {
                return Err(CommentError::NestedReply);
            }
        }

        let comment = Comment::new(self.id_generator.generate(), post_id, user_id, parent_id, request.content);
        let comment = self.comments.create(&comment).await?;

        info!(comment_id = comment.id, post_id, "Comment created");
        self.present_one(comment, user_id).await
    }

    async fn list(
        &self,
        post_id: i64,
        viewer_id: Option<i64>,
        pagination: Pagination,
    ) -> Result<Paginated<CommentResponse>, CommentError> {
        self.ensure_post_visible(post_id, viewer_id).await?;
        let page = self.comments.find_by_post(post_id, pagination).await?;
        self.present_page(page, viewer_id, pagination).await
    }

    async fn replies(
        &self,
        comment_id: i64,
        viewer_id: Option<i64>,
        pagination: Pagination,
    ) -> Result<Paginated<CommentResponse>, CommentError> {
        let parent = self.find(comment_id).await?;
        self.ensure_post_visible(parent.post_id, viewer_id).await?;
        let page = self.comments.replies(comment_id, pagination).await?;
        self.present_page(page, viewer_id, pagination).await
    }

    #[instrument(skip(self, request))]
    async fn update(&self, user_id: i64, comment_id: i64, request: UpdateCommentRequest) -> Result<CommentResponse, CommentError> {
        let mut comment = self.find(comment_id).await?;
        if comment.user_id != user_id {
            return Err(CommentError::AccessDenied);
        }

        comment.content = request.content;
        let comment = self.comments.update(&comment).await?;
        self.present_one(comment, user_id).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, user_id: i64, comment_id: i64) -> Result<(), CommentError> {
        let comment = self.find(comment_id).await?;
        if comment.user_id != user_id {
            let post_owner = self
                .posts
                .find_by_id(comment.post_id)
                .await?
                .map(|p| p.user_id);
            if post_owner != Some(user_id) {
                return Err(CommentError::AccessDenied);
            }
        }

        let removed = self.comments.delete(comment_id).await?;
        info!(comment_id, removed, "Comment deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn like(&self, user_id: i64, comment_id: i64) -> Result<LikeResponse, CommentError> {
        let comment = self.find(comment_id).await?;
        self.ensure_post_visible(comment.post_id, Some(user_id)).await?;

        if !self.comments.add_like(comment_id, user_id).await? {
            return Err(CommentError::AlreadyLiked);
        }
        Ok(LikeResponse {
            liked: true,
            likes_count: self.likes_count(comment_id).await?,
        })
    }

    #[instrument(skip(self))]
    async fn unlike(&self, user_id: i64, comment_id: i64) -> Result<LikeResponse, CommentError> {
        self.find(comment_id).await?;

        if !self.comments.remove_like(comment_id, user_id).await? {
            return Err(CommentError::NotLiked);
        }
        Ok(LikeResponse {
            liked: false,
            likes_count: self.likes_count(comment_id).await?,
        })
    }
}
