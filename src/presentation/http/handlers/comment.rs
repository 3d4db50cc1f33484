//! Comment Handlers

use axum::{extract::State, http::StatusCode};

use crate::application::dto::request::{CreateCommentRequest, PaginationQuery, UpdateCommentRequest};
use crate::application::dto::response::{CommentResponse, LikeResponse, Paginated};
use crate::presentation::http::extractors::{AuthUser, MaybeAuthUser, PathId, ValidatedJson, ValidatedQuery};
use crate::shared::error::AppError;
use crate::shared::response::{created, ApiResponse};
use crate::startup::AppState;

/// Comment on a post, or reply to one of its top-level comments
pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(post_id): PathId,
    ValidatedJson(body): ValidatedJson<CreateCommentRequest>,
) -> Result<(StatusCode, ApiResponse<CommentResponse>), AppError> {
    let comment = state.services.comments.create(auth.id, post_id, body).await?;
    Ok(created(comment, "Comment added"))
}

/// Top-level comments of a post
pub async fn list_comments(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    PathId(post_id): PathId,
    ValidatedQuery(query): ValidatedQuery<PaginationQuery>,
) -> Result<ApiResponse<Paginated<CommentResponse>>, AppError> {
    let page = state
        .services
        .comments
        .list(post_id, viewer.id(), query.pagination())
        .await?;
    Ok(ApiResponse::ok(page))
}

pub async fn list_replies(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    PathId(comment_id): PathId,
    ValidatedQuery(query): ValidatedQuery<PaginationQuery>,
) -> Result<ApiResponse<Paginated<CommentResponse>>, AppError> {
    let page = state
        .services
        .comments
        .replies(comment_id, viewer.id(), query.pagination())
        .await?;
    Ok(ApiResponse::ok(page))
}

pub async fn update_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(comment_id): PathId,
    ValidatedJson(body): ValidatedJson<UpdateCommentRequest>,
) -> Result<ApiResponse<CommentResponse>, AppError> {
    let comment = state.services.comments.update(auth.id, comment_id, body).await?;
    Ok(ApiResponse::ok(comment).with_message("Comment updated"))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(comment_id): PathId,
) -> Result<ApiResponse, AppError> {
    state.services.comments.delete(auth.id, comment_id).await?;
    Ok(ApiResponse::message("Comment deleted"))
}

pub async fn like_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(comment_id): PathId,
) -> Result<ApiResponse<LikeResponse>, AppError> {
    let like = state.services.comments.like(auth.id, comment_id).await?;
    Ok(ApiResponse::ok(like))
}

pub async fn unlike_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(comment_id): PathId,
) -> Result<ApiResponse<LikeResponse>, AppError> {
    let like = state.services.comments.unlike(auth.id, comment_id).await?;
    Ok(ApiResponse::ok(like))
}
