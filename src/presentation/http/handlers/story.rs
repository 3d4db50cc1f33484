//! Story Handlers

use axum::{extract::State, http::StatusCode};

use crate::application::dto::request::{CreateStoryRequest, PaginationQuery};
use crate::application::dto::response::{Paginated, StoryGroupResponse, StoryResponse, StoryViewerResponse};
use crate::presentation::http::extractors::{validated, AuthUser, MaybeAuthUser, MultipartForm, PathId, ValidatedQuery};
use crate::shared::error::AppError;
use crate::shared::response::{created, ApiResponse};
use crate::startup::AppState;

/// Multipart: one `media` file and an optional `caption`
pub async fn create_story(
    State(state): State<AppState>,
    auth: AuthUser,
    mut form: MultipartForm,
) -> Result<(StatusCode, ApiResponse<StoryResponse>), AppError> {
    let request = validated(CreateStoryRequest {
        caption: form.text("caption"),
    })?;
    let file = form.take_file("media")?;

    let story = state.services.stories.create(auth.id, request, file).await?;
    Ok(created(story, "Story created"))
}

/// Active stories of the caller and accounts they follow
pub async fn story_feed(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<Vec<StoryGroupResponse>>, AppError> {
    let groups = state.services.stories.feed(auth.id).await?;
    Ok(ApiResponse::ok(groups))
}

pub async fn user_stories(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    PathId(user_id): PathId,
) -> Result<ApiResponse<Vec<StoryResponse>>, AppError> {
    let stories = state.services.stories.user_stories(user_id, viewer.id()).await?;
    Ok(ApiResponse::ok(stories))
}

pub async fn view_story(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(story_id): PathId,
) -> Result<ApiResponse<StoryResponse>, AppError> {
    let story = state.services.stories.view(auth.id, story_id).await?;
    Ok(ApiResponse::ok(story))
}

pub async fn story_viewers(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(story_id): PathId,
    ValidatedQuery(query): ValidatedQuery<PaginationQuery>,
) -> Result<ApiResponse<Paginated<StoryViewerResponse>>, AppError> {
    let page = state
        .services
        .stories
        .viewers(auth.id, story_id, query.pagination())
        .await?;
    Ok(ApiResponse::ok(page))
}

pub async fn delete_story(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(story_id): PathId,
) -> Result<ApiResponse, AppError> {
    state.services.stories.delete(auth.id, story_id).await?;
    Ok(ApiResponse::message("Story deleted"))
}
