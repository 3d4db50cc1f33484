//! User Handlers
//!
//! Profiles, avatar uploads, search and the follow graph.

use axum::extract::{Path, State};

use crate::application::dto::request::{PaginationQuery, SearchQuery, UpdateProfileRequest};
use crate::application::dto::response::{FollowResponse, Paginated, ProfileResponse, UserResponse, UserSummary};
use crate::presentation::http::extractors::{AuthUser, MaybeAuthUser, MultipartForm, PathId, ValidatedJson, ValidatedQuery};
use crate::shared::error::AppError;
use crate::shared::response::ApiResponse;
use crate::startup::AppState;

pub async fn search_users(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<SearchQuery>,
) -> Result<ApiResponse<Paginated<UserSummary>>, AppError> {
    let page = state.services.users.search(&query.q, query.pagination()).await?;
    Ok(ApiResponse::ok(page))
}

/// Profile by username
pub async fn get_profile(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(username): Path<String>,
) -> Result<ApiResponse<ProfileResponse>, AppError> {
    let profile = state.services.users.get_profile(&username, viewer.id()).await?;
    Ok(ApiResponse::ok(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<UpdateProfileRequest>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user = state.services.users.update_profile(auth.id, body).await?;
    Ok(ApiResponse::ok(user).with_message("Profile updated"))
}

/// Multipart upload with a single `avatar` file
pub async fn upload_avatar(
    State(state): State<AppState>,
    auth: AuthUser,
    mut form: MultipartForm,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let file = form.take_file("avatar")?;
    let user = state.services.users.update_avatar(auth.id, file).await?;
    Ok(ApiResponse::ok(user).with_message("Avatar updated"))
}

pub async fn remove_avatar(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user = state.services.users.remove_avatar(auth.id).await?;
    Ok(ApiResponse::ok(user).with_message("Avatar removed"))
}

pub async fn follow(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(target_id): PathId,
) -> Result<ApiResponse<FollowResponse>, AppError> {
    let response = state.services.users.follow(auth.id, target_id).await?;
    Ok(ApiResponse::ok(response))
}

pub async fn unfollow(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(target_id): PathId,
) -> Result<ApiResponse, AppError> {
    state.services.users.unfollow(auth.id, target_id).await?;
    Ok(ApiResponse::message("Unfollowed"))
}

/// Pending requests addressed to the caller
pub async fn follow_requests(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedQuery(query): ValidatedQuery<PaginationQuery>,
) -> Result<ApiResponse<Paginated<UserSummary>>, AppError> {
    let page = state.services.users.follow_requests(auth.id, query.pagination()).await?;
    Ok(ApiResponse::ok(page))
}

pub async fn accept_follow_request(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(requester_id): PathId,
) -> Result<ApiResponse, AppError> {
    state.services.users.accept_request(auth.id, requester_id).await?;
    Ok(ApiResponse::message("Follow request accepted"))
}

pub async fn reject_follow_request(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(requester_id): PathId,
) -> Result<ApiResponse, AppError> {
    state.services.users.reject_request(auth.id, requester_id).await?;
    Ok(ApiResponse::message("Follow request rejected"))
}

pub async fn followers(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    PathId(user_id): PathId,
    ValidatedQuery(query): ValidatedQuery<PaginationQuery>,
) -> Result<ApiResponse<Paginated<UserSummary>>, AppError> {
    let page = state
        .services
        .users
        .followers(user_id, viewer.id(), query.pagination())
        .await?;
    Ok(ApiResponse::ok(page))
}

pub async fn following(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    PathId(user_id): PathId,
    ValidatedQuery(query): ValidatedQuery<PaginationQuery>,
) -> Result<ApiResponse<Paginated<UserSummary>>, AppError> {
    let page = state
        .services
        .users
        .following(user_id, viewer.id(), query.pagination())
        .await?;
    Ok(ApiResponse::ok(page))
}
