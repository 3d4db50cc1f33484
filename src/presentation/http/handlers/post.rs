//! Post Handlers

use axum::{extract::State, http::StatusCode};

use crate::application::dto::request::{CreatePostRequest, PaginationQuery, UpdatePostRequest, UserPostsQuery};
use crate::application::dto::response::{LikeResponse, Paginated, PostResponse, UserSummary};
use crate::presentation::http::extractors::{
    validated, AuthUser, MaybeAuthUser, MultipartForm, PathId, ValidatedJson, ValidatedQuery,
};
use crate::shared::error::AppError;
use crate::shared::response::{created, ApiResponse};
use crate::startup::AppState;

/// Multipart: `media` files plus `caption`, `location`, `likesEnabled`,
/// `commentsEnabled` text fields.
pub async fn create_post(
    State(state): State<AppState>,
    auth: AuthUser,
    mut form: MultipartForm,
) -> Result<(StatusCode, ApiResponse<PostResponse>), AppError> {
    let request = validated(CreatePostRequest {
        caption: form.text("caption"),
        location: form.text("location"),
        likes_enabled: form.flag("likesEnabled")?.unwrap_or(true),
        comments_enabled: form.flag("commentsEnabled")?.unwrap_or(true),
    })?;
    let files = form.take_files("media");

    let post = state.services.posts.create(auth.id, request, files).await?;
    Ok(created(post, "Post created"))
}

pub async fn feed(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedQuery(query): ValidatedQuery<PaginationQuery>,
) -> Result<ApiResponse<Paginated<PostResponse>>, AppError> {
    let page = state.services.posts.feed(auth.id, query.pagination()).await?;
    Ok(ApiResponse::ok(page))
}

pub async fn explore(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    ValidatedQuery(query): ValidatedQuery<PaginationQuery>,
) -> Result<ApiResponse<Paginated<PostResponse>>, AppError> {
    let page = state.services.posts.explore(viewer.id(), query.pagination()).await?;
    Ok(ApiResponse::ok(page))
}

pub async fn user_posts(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    PathId(user_id): PathId,
    ValidatedQuery(query): ValidatedQuery<UserPostsQuery>,
) -> Result<ApiResponse<Paginated<PostResponse>>, AppError> {
    let page = state
        .services
        .posts
        .user_posts(user_id, viewer.id(), query.archived, query.pagination())
        .await?;
    Ok(ApiResponse::ok(page))
}

pub async fn get_post(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    PathId(post_id): PathId,
) -> Result<ApiResponse<PostResponse>, AppError> {
    let post = state.services.posts.get(post_id, viewer.id()).await?;
    Ok(ApiResponse::ok(post))
}

pub async fn update_post(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(post_id): PathId,
    ValidatedJson(body): ValidatedJson<UpdatePostRequest>,
) -> Result<ApiResponse<PostResponse>, AppError> {
    let post = state.services.posts.update(auth.id, post_id, body).await?;
    Ok(ApiResponse::ok(post).with_message("Post updated"))
}

pub async fn delete_post(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(post_id): PathId,
) -> Result<ApiResponse, AppError> {
    state.services.posts.delete(auth.id, post_id).await?;
    Ok(ApiResponse::message("Post deleted"))
}

pub async fn archive_post(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(post_id): PathId,
) -> Result<ApiResponse<PostResponse>, AppError> {
    let post = state.services.posts.archive(auth.id, post_id).await?;
    Ok(ApiResponse::ok(post).with_message("Post archived"))
}

pub async fn unarchive_post(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(post_id): PathId,
) -> Result<ApiResponse<PostResponse>, AppError> {
    let post = state.services.posts.unarchive(auth.id, post_id).await?;
    Ok(ApiResponse::ok(post).with_message("Post unarchived"))
}

pub async fn like_post(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(post_id): PathId,
) -> Result<ApiResponse<LikeResponse>, AppError> {
    let like = state.services.posts.like(auth.id, post_id).await?;
    Ok(ApiResponse::ok(like))
}

pub async fn unlike_post(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(post_id): PathId,
) -> Result<ApiResponse<LikeResponse>, AppError> {
    let like = state.services.posts.unlike(auth.id, post_id).await?;
    Ok(ApiResponse::ok(like))
}

pub async fn post_likes(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    PathId(post_id): PathId,
    ValidatedQuery(query): ValidatedQuery<PaginationQuery>,
) -> Result<ApiResponse<Paginated<UserSummary>>, AppError> {
    let page = state
        .services
        .posts
        .likers(post_id, viewer.id(), query.pagination())
        .await?;
    Ok(ApiResponse::ok(page))
}
