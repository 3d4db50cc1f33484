//! Hashtag Handlers

use axum::extract::{Path, State};

use crate::application::dto::request::{LimitQuery, PaginationQuery, SearchQuery};
use crate::application::dto::response::{HashtagResponse, Paginated, PostResponse};
use crate::presentation::http::extractors::{MaybeAuthUser, ValidatedQuery};
use crate::shared::error::AppError;
use crate::shared::response::ApiResponse;
use crate::startup::AppState;

const DEFAULT_TRENDING_LIMIT: u32 = 10;

pub async fn trending(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<LimitQuery>,
) -> Result<ApiResponse<Vec<HashtagResponse>>, AppError> {
    let tags = state
        .services
        .hashtags
        .trending(query.limit_or(DEFAULT_TRENDING_LIMIT))
        .await?;
    Ok(ApiResponse::ok(tags))
}

pub async fn search(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<SearchQuery>,
) -> Result<ApiResponse<Vec<HashtagResponse>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_TRENDING_LIMIT) as i64;
    let tags = state.services.hashtags.search(&query.q, limit).await?;
    Ok(ApiResponse::ok(tags))
}

pub async fn get_hashtag(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<ApiResponse<HashtagResponse>, AppError> {
    let tag = state.services.hashtags.get(&name).await?;
    Ok(ApiResponse::ok(tag))
}

pub async fn hashtag_posts(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(name): Path<String>,
    ValidatedQuery(query): ValidatedQuery<PaginationQuery>,
) -> Result<ApiResponse<Paginated<PostResponse>>, AppError> {
    let page = state
        .services
        .hashtags
        .posts(&name, viewer.id(), query.pagination())
        .await?;
    Ok(ApiResponse::ok(page))
}
