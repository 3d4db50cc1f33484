//! User Service
//!
//! Profiles, avatars, search and the follow graph (including follow
//! requests towards private accounts).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use super::support::delete_media_best_effort;
use crate::application::dto::request::{UpdateProfileRequest, UploadedFile};
use crate::application::dto::response::{
    FollowResponse, Paginated, ProfileResponse, UserResponse, UserSummary,
};
use crate::config::MediaSettings;
use crate::domain::{
    Follow, FollowRepository, FollowStatus, Pagination, User, UserRepository, VisibilityService,
};
use crate::infrastructure::media::{media_key, MediaError, MediaStore, UploadOptions};
use crate::shared::error::AppError;

/// User service trait
#[async_trait]
pub trait UserService: Send + Sync {
    /// The authenticated user's own record
    async fn get_me(&self, user_id: i64) -> Result<UserResponse, UserError>;

    /// Profile by username as seen by `viewer_id`
    async fn get_profile(&self, username: &str, viewer_id: Option<i64>) -> Result<ProfileResponse, UserError>;

    async fn search(&self, query: &str, pagination: Pagination) -> Result<Paginated<UserSummary>, UserError>;

    async fn update_profile(&self, user_id: i64, request: UpdateProfileRequest) -> Result<UserResponse, UserError>;

    /// Replace the avatar; the previous file is removed best-effort
    async fn update_avatar(&self, user_id: i64, file: UploadedFile) -> Result<UserResponse, UserError>;

    async fn remove_avatar(&self, user_id: i64) -> Result<UserResponse, UserError>;

    /// Follow `target_id`: accepted for public accounts, pending for private ones
    async fn follow(&self, follower_id: i64, target_id: i64) -> Result<FollowResponse, UserError>;

    /// Remove a follow edge or withdraw a pending request
    async fn unfollow(&self, follower_id: i64, target_id: i64) -> Result<(), UserError>;

    async fn follow_requests(&self, user_id: i64, pagination: Pagination) -> Result<Paginated<UserSummary>, UserError>;

    async fn accept_request(&self, user_id: i64, requester_id: i64) -> Result<(), UserError>;

    async fn reject_request(&self, user_id: i64, requester_id: i64) -> Result<(), UserError>;

    async fn followers(
        &self,
        user_id: i64,
        viewer_id: Option<i64>,
        pagination: Pagination,
    ) -> Result<Paginated<UserSummary>, UserError>;

    async fn following(
        &self,
        user_id: i64,
        viewer_id: Option<i64>,
        pagination: Pagination,
    ) -> Result<Paginated<UserSummary>, UserError>;
}

/// User service errors
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("You cannot follow yourself")]
    CannotFollowSelf,

    #[error("Already following this user")]
    AlreadyFollowing,

    #[error("Follow request already sent")]
    RequestPending,

    #[error("Not following this user")]
    NotFollowing,

    #[error("Follow request not found")]
    RequestNotFound,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        let message = err.to_string();
        match err {
            UserError::NotFound => AppError::not_found("USER_NOT_FOUND", message),
            UserError::CannotFollowSelf => AppError::bad_request("CANNOT_FOLLOW_SELF", message),
            UserError::AlreadyFollowing | UserError::RequestPending => {
                AppError::bad_request("ALREADY_FOLLOWING", message)
            }
            UserError::NotFollowing => AppError::bad_request("NOT_FOLLOWING", message),
            UserError::RequestNotFound => AppError::not_found("FOLLOW_REQUEST_NOT_FOUND", message),
            UserError::Media(e) => e.into(),
            UserError::App(e) => e,
        }
    }
}

/// UserService implementation
pub struct UserServiceImpl {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
    media: Arc<dyn MediaStore>,
    media_settings: MediaSettings,
}

impl UserServiceImpl {
    pub fn new(
        users: Arc<dyn UserRepository>,
        follows: Arc<dyn FollowRepository>,
        media: Arc<dyn MediaStore>,
        media_settings: MediaSettings,
    ) -> Self {
        Self {
            users,
            follows,
            media,
            media_settings,
        }
    }

    async fn find_user(&self, user_id: i64) -> Result<User, UserError> {
        self.users.find_by_id(user_id).await?.ok_or(UserError::NotFound)
    }

    /// Private follower lists are limited to the owner and accepted followers.
    async fn visible_user(&self, user_id: i64, viewer_id: Option<i64>) -> Result<User, UserError> {
        let user = self.find_user(user_id).await?;
        VisibilityService::ensure_can_view(&user, viewer_id, self.follows.as_ref()).await?;
        Ok(user)
    }
}

fn summaries(page: crate::domain::Page<User>, pagination: Pagination) -> Paginated<UserSummary> {
    Paginated::new(page.map(|u| UserSummary::from(&u)), pagination)
}

#[async_trait]
impl UserService for UserServiceImpl {
    async fn get_me(&self, user_id: i64) -> Result<UserResponse, UserError> {
        let user = self.find_user(user_id).await?;
        Ok(UserResponse::from_user(user, true))
    }

    #[instrument(skip(self))]
    async fn get_profile(&self, username: &str, viewer_id: Option<i64>) -> Result<ProfileResponse, UserError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(UserError::NotFound)?;

        let is_own_profile = viewer_id == Some(user.id);
        let follow_status = match viewer_id {
            Some(viewer) if !is_own_profile => self
                .follows
                .find(viewer, user.id)
                .await?
                .map(|follow| follow.status),
            _ => None,
        };

        Ok(ProfileResponse {
            user: UserResponse::from_user(user, is_own_profile),
            is_own_profile,
            is_following: follow_status == Some(FollowStatus::Accepted),
            follow_status,
        })
    }

    async fn search(&self, query: &str, pagination: Pagination) -> Result<Paginated<UserSummary>, UserError> {
        let page = self.users.search(query, pagination).await?;
        Ok(summaries(page, pagination))
    }

    #[instrument(skip(self, request))]
    async fn update_profile(&self, user_id: i64, request: UpdateProfileRequest) -> Result<UserResponse, UserError> {
        let mut user = self.find_user(user_id).await?;

        if let Some(full_name) = request.full_name {
            user.full_name = Some(full_name).filter(|s| !s.is_empty());
        }
        if let Some(bio) = request.bio {
            user.bio = Some(bio).filter(|s| !s.is_empty());
        }
        if let Some(website) = request.website {
            user.website = Some(website).filter(|s| !s.is_empty());
        }
        if let Some(is_private) = request.is_private {
            user.is_private = is_private;
        }

        let user = self.users.update(&user).await?;
        info!(user_id, "Profile updated");
        Ok(UserResponse::from_user(user, true))
    }

    #[instrument(skip(self, file), fields(size = file.data.len()))]
    async fn update_avatar(&self, user_id: i64, file: UploadedFile) -> Result<UserResponse, UserError> {
        let mut user = self.find_user(user_id).await?;

        let stored = self
            .media
            .upload(
                file.data,
                &file.content_type,
                UploadOptions::new("avatars", media_key(user_id, 0), Some(self.media_settings.avatar_profile)),
            )
            .await?;

        let previous = user.avatar_url.replace(stored.url);
        let user = match self.users.update(&user).await {
            Ok(user) => user,
            Err(e) => {
                // The new file is orphaned if the row was not written
                if let Some(url) = user.avatar_url.take() {
                    delete_media_best_effort(self.media.as_ref(), &[url]).await;
                }
                return Err(e.into());
            }
        };

        if let Some(previous) = previous {
            delete_media_best_effort(self.media.as_ref(), &[previous]).await;
        }

        info!(user_id, "Avatar updated");
        Ok(UserResponse::from_user(user, true))
    }

    #[instrument(skip(self))]
    async fn remove_avatar(&self, user_id: i64) -> Result<UserResponse, UserError> {
        let mut user = self.find_user(user_id).await?;

        let Some(previous) = user.avatar_url.take() else {
            return Ok(UserResponse::from_user(user, true));
        };

        let user = self.users.update(&user).await?;
        delete_media_best_effort(self.media.as_ref(), &[previous]).await;

        Ok(UserResponse::from_user(user, true))
    }

    #[instrument(skip(self))]
    async fn follow(&self, follower_id: i64, target_id: i64) -> Result<FollowResponse, UserError> {
        if follower_id == target_id {
            return Err(UserError::CannotFollowSelf);
        }
        let target = self.find_user(target_id).await?;

        if let Some(existing) = self.follows.find(follower_id, target_id).await? {
            return Err(if existing.is_accepted() {
                UserError::AlreadyFollowing
            } else {
                UserError::RequestPending
            });
        }

        let status = if target.is_private {
            FollowStatus::Pending
        } else {
            FollowStatus::Accepted
        };
        let follow = self
            .follows
            .create(&Follow::new(follower_id, target_id, status))
            .await?;

        info!(follower_id, target_id, status = follow.status.as_str(), "Follow created");
        Ok(FollowResponse { status: follow.status })
    }

    #[instrument(skip(self))]
    async fn unfollow(&self, follower_id: i64, target_id: i64) -> Result<(), UserError> {
        self.follows
            .delete(follower_id, target_id)
            .await?
            .ok_or(UserError::NotFollowing)?;

        info!(follower_id, target_id, "Follow removed");
        Ok(())
    }

    async fn follow_requests(&self, user_id: i64, pagination: Pagination) -> Result<Paginated<UserSummary>, UserError> {
        let page = self.follows.pending_requests(user_id, pagination).await?;
        Ok(summaries(page, pagination))
    }

    #[instrument(skip(self))]
    async fn accept_request(&self, user_id: i64, requester_id: i64) -> Result<(), UserError> {
        self.follows
            .accept(requester_id, user_id)
            .await?
            .ok_or(UserError::RequestNotFound)?;

        info!(user_id, requester_id, "Follow request accepted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reject_request(&self, user_id: i64, requester_id: i64) -> Result<(), UserError> {
        match self.follows.find(requester_id, user_id).await? {
            Some(follow) if !follow.is_accepted() => {
                self.follows.delete(requester_id, user_id).await?;
                info!(user_id, requester_id, "Follow request rejected");
                Ok(())
            }
            _ => Err(UserError::RequestNotFound),
        }
    }

    async fn followers(
        &self,
        user_id: i64,
        viewer_id: Option<i64>,
        pagination: Pagination,
    ) -> Result<Paginated<UserSummary>, UserError> {
        self.visible_user(user_id, viewer_id).await?;
        let page = self.follows.followers(user_id, pagination).await?;
        Ok(summaries(page, pagination))
    }

    async fn following(
        &self,
        user_id: i64,
        viewer_id: Option<i64>,
        pagination: Pagination,
    ) -> Result<Paginated<UserSummary>, UserError> {
        self.visible_user(user_id, viewer_id).await?;
        let page = self.follows.following(user_id, pagination).await?;
        Ok(summaries(page, pagination))
    }
}
