//! Post Service
//!
//! Handles post creation with media uploads, feeds, archive state and likes.
//! Counter changes (`postsCount`, `likesCount`) happen inside the repository
//! write that creates or removes the mirrored row.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::support::{delete_media_best_effort, post_page, post_responses, visible_post};
use crate::application::dto::request::{CreatePostRequest, UpdatePostRequest, UploadedFile};
use crate::application::dto::response::{LikeResponse, Paginated, PostResponse, UserSummary};
use crate::config::MediaSettings;
use crate::domain::{
    extract_hashtags, FollowRepository, Media, Pagination, Post, PostRepository, User,
    UserRepository, VisibilityService,
};
use crate::infrastructure::media::{media_key, MediaError, MediaStore, UploadOptions};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Post service trait
#[async_trait]
pub trait PostService: Send + Sync {
    /// Upload the files and create the post in one repository write
    async fn create(
        &self,
        user_id: i64,
        request: CreatePostRequest,
        files: Vec<UploadedFile>,
    ) -> Result<PostResponse, PostError>;

    /// Own posts plus posts of accepted followings, newest first
    async fn feed(&self, user_id: i64, pagination: Pagination) -> Result<Paginated<PostResponse>, PostError>;

    /// Public posts ranked by likes
    async fn explore(&self, viewer_id: Option<i64>, pagination: Pagination) -> Result<Paginated<PostResponse>, PostError>;

    async fn user_posts(
        &self,
        user_id: i64,
        viewer_id: Option<i64>,
        archived: bool,
        pagination: Pagination,
    ) -> Result<Paginated<PostResponse>, PostError>;

    async fn get(&self, post_id: i64, viewer_id: Option<i64>) -> Result<PostResponse, PostError>;

    async fn update(&self, user_id: i64, post_id: i64, request: UpdatePostRequest) -> Result<PostResponse, PostError>;

    async fn delete(&self, user_id: i64, post_id: i64) -> Result<(), PostError>;

    async fn archive(&self, user_id: i64, post_id: i64) -> Result<PostResponse, PostError>;

    async fn unarchive(&self, user_id: i64, post_id: i64) -> Result<PostResponse, PostError>;

    async fn like(&self, user_id: i64, post_id: i64) -> Result<LikeResponse, PostError>;

    async fn unlike(&self, user_id: i64, post_id: i64) -> Result<LikeResponse, PostError>;

    async fn likers(
        &self,
        post_id: i64,
        viewer_id: Option<i64>,
        pagination: Pagination,
    ) -> Result<Paginated<UserSummary>, PostError>;
}

/// Post service errors
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("Post not found")]
    NotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Access denied")]
    AccessDenied,

    #[error("At least one media file is required")]
    MediaRequired,

    #[error("At most {0} media files are allowed")]
    TooManyFiles(usize),

    #[error("Post is already archived")]
    AlreadyArchived,

    #[error("Post is not archived")]
    NotArchived,

    #[error("Likes are disabled for this post")]
    LikesDisabled,

    #[error("Post already liked")]
    AlreadyLiked,

    #[error("Post not liked")]
    NotLiked,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<PostError> for AppError {
    fn from(err: PostError) -> Self {
        let message = err.to_string();
        match err {
            PostError::NotFound => AppError::not_found("POST_NOT_FOUND", message),
            PostError::UserNotFound => AppError::not_found("USER_NOT_FOUND", message),
            PostError::AccessDenied => AppError::access_denied(),
            PostError::MediaRequired | PostError::TooManyFiles(_) => {
                AppError::invalid_field("media", &message)
            }
            PostError::AlreadyArchived => AppError::bad_request("POST_ALREADY_ARCHIVED", message),
            PostError::NotArchived => AppError::bad_request("POST_NOT_ARCHIVED", message),
            PostError::LikesDisabled => AppError::bad_request("LIKES_DISABLED", message),
            PostError::AlreadyLiked => AppError::bad_request("ALREADY_LIKED", message),
            PostError::NotLiked => AppError::bad_request("NOT_LIKED", message),
            PostError::Media(e) => e.into(),
            PostError::App(e) => e,
        }
    }
}

/// PostService implementation
pub struct PostServiceImpl {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
    posts: Arc<dyn PostRepository>,
    media: Arc<dyn MediaStore>,
    id_generator: Arc<SnowflakeGenerator>,
    media_settings: MediaSettings,
}

impl PostServiceImpl {
    pub fn new(
        users: Arc<dyn UserRepository>,
        follows: Arc<dyn FollowRepository>,
        posts: Arc<dyn PostRepository>,
        media: Arc<dyn MediaStore>,
        id_generator: Arc<SnowflakeGenerator>,
        media_settings: MediaSettings,
    ) -> Self {
        Self {
            users,
            follows,
            posts,
            media,
            id_generator,
            media_settings,
        }
    }

    async fn visible(&self, post_id: i64, viewer_id: Option<i64>) -> Result<(Post, User), PostError> {
        Ok(visible_post(
            self.posts.as_ref(),
            self.users.as_ref(),
            self.follows.as_ref(),
            post_id,
            viewer_id,
        )
        .await?)
    }

    /// Load a post for a mutation by its owner.
    async fn owned(&self, user_id: i64, post_id: i64) -> Result<Post, PostError> {
        let post = self.posts.find_by_id(post_id).await?.ok_or(PostError::NotFound)?;
        if !post.is_owned_by(user_id) {
            return Err(PostError::AccessDenied);
        }
        Ok(post)
    }

    async fn respond(&self, post: Post, viewer_id: i64) -> Result<PostResponse, PostError> {
        let mut responses =
            post_responses(self.users.as_ref(), self.posts.as_ref(), vec![post], Some(viewer_id)).await?;
        responses.pop().ok_or(PostError::NotFound)
    }

    async fn set_archived(&self, user_id: i64, post_id: i64, archived: bool) -> Result<PostResponse, PostError> {
        let mut post = self.owned(user_id, post_id).await?;
        match (post.is_archived, archived) {
            (true, true) => return Err(PostError::AlreadyArchived),
            (false, false) => return Err(PostError::NotArchived),
            _ => {}
        }
        post.is_archived = archived;

        let post = self.posts.update(&post, None).await?;
        info!(post_id, archived, "Post archive state changed");
        self.respond(post, user_id).await
    }

    async fn likes_count(&self, post_id: i64) -> Result<i64, PostError> {
        Ok(self
            .posts
            .find_by_id(post_id)
            .await?
            .map(|p| p.likes_count)
            .unwrap_or_default())
    }

    /// Upload every file; on failure the files uploaded so far are removed.
    async fn upload_all(&self, user_id: i64, post_id: i64, files: Vec<UploadedFile>) -> Result<Vec<Media>, PostError> {
        let mut media = Vec::with_capacity(files.len());

        for (index, file) in files.into_iter().enumerate() {
            let options = UploadOptions::new(
                "posts",
                media_key(user_id, index),
                Some(self.media_settings.post_profile),
            );
            match self.media.upload(file.data, &file.content_type, options).await {
                Ok(stored) => media.push(Media {
                    id: self.id_generator.generate(),
                    post_id,
                    url: stored.url,
                    kind: stored.kind,
                    width: stored.width.map(|w| w as i32),
                    height: stored.height.map(|h| h as i32),
                    position: index as i32,
                }),
                Err(e) => {
                    warn!(error = %e, index, "Post media upload failed");
                    let urls: Vec<String> = media.into_iter().map(|m: Media| m.url).collect();
                    delete_media_best_effort(self.media.as_ref(), &urls).await;
                    return Err(e.into());
                }
            }
        }

        Ok(media)
    }
}

#[async_trait]
impl PostService for PostServiceImpl {
    #[instrument(skip(self, request, files), fields(files = files.len()))]
    async fn create(
        &self,
        user_id: i64,
        request: CreatePostRequest,
        files: Vec<UploadedFile>,
    ) -> Result<PostResponse, PostError> {
        if files.is_empty() {
            return Err(PostError::MediaRequired);
        }
        if files.len() > self.media_settings.max_files_per_post {
            return Err(PostError::TooManyFiles(self.media_settings.max_files_per_post));
        }

        let mut post = Post::new(self.id_generator.generate(), user_id);
        post.caption = request.caption.filter(|c| !c.is_empty());
        post.location = request.location.filter(|l| !l.is_empty());
        post.likes_enabled = request.likes_enabled;
        post.comments_enabled = request.comments_enabled;
        post.media = self.upload_all(user_id, post.id, files).await?;

        let hashtags = post.caption.as_deref().map(extract_hashtags).unwrap_or_default();

        let post = match self.posts.create(&post, &hashtags).await {
            Ok(post) => post,
            Err(e) => {
                let urls: Vec<String> = post.media.iter().map(|m| m.url.clone()).collect();
                delete_media_best_effort(self.media.as_ref(), &urls).await;
                return Err(e.into());
            }
        };

        info!(post_id = post.id, user_id, hashtags = hashtags.len(), "Post created");
        self.respond(post, user_id).await
    }

    async fn feed(&self, user_id: i64, pagination: Pagination) -> Result<Paginated<PostResponse>, PostError> {
        let mut authors = self.follows.following_ids(user_id).await?;
        authors.push(user_id);

        let page = self.posts.feed(&authors, pagination).await?;
        Ok(post_page(self.users.as_ref(), self.posts.as_ref(), page, Some(user_id), pagination).await?)
    }

    async fn explore(&self, viewer_id: Option<i64>, pagination: Pagination) -> Result<Paginated<PostResponse>, PostError> {
        let page = self.posts.explore(viewer_id, pagination).await?;
        Ok(post_page(self.users.as_ref(), self.posts.as_ref(), page, viewer_id, pagination).await?)
    }

    #[instrument(skip(self))]
    async fn user_posts(
        &self,
        user_id: i64,
        viewer_id: Option<i64>,
        archived: bool,
        pagination: Pagination,
    ) -> Result<Paginated<PostResponse>, PostError> {
        let owner = self.users.find_by_id(user_id).await?.ok_or(PostError::UserNotFound)?;
        VisibilityService::ensure_can_view(&owner, viewer_id, self.follows.as_ref()).await?;

        if archived && viewer_id != Some(owner.id) {
            return Err(PostError::AccessDenied);
        }

        let page = self.posts.find_by_user(user_id, archived, pagination).await?;
        Ok(post_page(self.users.as_ref(), self.posts.as_ref(), page, viewer_id, pagination).await?)
    }

    async fn get(&self, post_id: i64, viewer_id: Option<i64>) -> Result<PostResponse, PostError> {
        let (post, _) = self.visible(post_id, viewer_id).await?;
        let mut responses = post_responses(self.users.as_ref(), self.posts.as_ref(), vec![post], viewer_id).await?;
        responses.pop().ok_or(PostError::NotFound)
    }

    #[instrument(skip(self, request))]
    async fn update(&self, user_id: i64, post_id: i64, request: UpdatePostRequest) -> Result<PostResponse, PostError> {
        let mut post = self.owned(user_id, post_id).await?;

        let hashtags = request.caption.as_deref().map(extract_hashtags);
        if let Some(caption) = request.caption {
            post.caption = Some(caption).filter(|c| !c.is_empty());
        }
        if let Some(location) = request.location {
            post.location = Some(location).filter(|l| !l.is_empty());
        }
        if let Some(likes_enabled) = request.likes_enabled {
            post.likes_enabled = likes_enabled;
        }
        if let Some(comments_enabled) = request.comments_enabled {
            post.comments_enabled = comments_enabled;
        }

        let post = self.posts.update(&post, hashtags.as_deref()).await?;
        info!(post_id, "Post updated");
        self.respond(post, user_id).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, user_id: i64, post_id: i64) -> Result<(), PostError> {
        self.owned(user_id, post_id).await?;

        let deleted = self.posts.delete(post_id).await?.ok_or(PostError::NotFound)?;
        let urls: Vec<String> = deleted.media.into_iter().map(|m| m.url).collect();
        delete_media_best_effort(self.media.as_ref(), &urls).await;

        info!(post_id, user_id, "Post deleted");
        Ok(())
    }

    async fn archive(&self, user_id: i64, post_id: i64) -> Result<PostResponse, PostError> {
        self.set_archived(user_id, post_id, true).await
    }

    async fn unarchive(&self, user_id: i64, post_id: i64) -> Result<PostResponse, PostError> {
        self.set_archived(user_id, post_id, false).await
    }

    #[instrument(skip(self))]
    async fn like(&self, user_id: i64, post_id: i64) -> Result<LikeResponse, PostError> {
        let (post, _) = self.visible(post_id, Some(user_id)).await?;
        if !post.likes_enabled {
            return Err(PostError::LikesDisabled);
        }
        if !self.posts.add_like(post_id, user_id).await? {
            return Err(PostError::AlreadyLiked);
        }

        Ok(LikeResponse {
            liked: true,
            likes_count: self.likes_count(post_id).await?,
        })
    }

    #[instrument(skip(self))]
    async fn unlike(&self, user_id: i64, post_id: i64) -> Result<LikeResponse, PostError> {
        self.visible(post_id, Some(user_id)).await?;
        if !self.posts.remove_like(post_id, user_id).await? {
            return Err(PostError::NotLiked);
        }

        Ok(LikeResponse {
            liked: false,
            likes_count: self.likes_count(post_id).await?,
        })
    }

    async fn likers(
        &self,
        post_id: i64,
        viewer_id: Option<i64>,
        pagination: Pagination,
    ) -> Result<Paginated<UserSummary>, PostError> {
        self.visible(post_id, viewer_id).await?;
        let page = self.posts.likers(post_id, pagination).await?;
        Ok(Paginated::new(page.map(|u| UserSummary::from(&u)), pagination))
    }
}
