//! Conversation Handlers
//!
//! Direct and group conversations and their membership.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use crate::application::dto::request::{AddMembersRequest, CreateConversationRequest, PaginationQuery, UpdateConversationRequest};
use crate::application::dto::response::{ConversationResponse, Paginated};
use crate::presentation::http::extractors::{parse_path_id, AuthUser, PathId, ValidatedJson, ValidatedQuery};
use crate::shared::error::AppError;
use crate::shared::response::ApiResponse;
use crate::startup::AppState;

/// 201 for a new conversation, 200 when an existing direct conversation is
/// returned.
pub async fn create_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CreateConversationRequest>,
) -> Result<(StatusCode, ApiResponse<ConversationResponse>), AppError> {
    let result = state.services.conversations.create(auth.id, body).await?;

    if result.created {
        Ok((
            StatusCode::CREATED,
            ApiResponse::ok(result.conversation).with_message("Conversation created"),
        ))
    } else {
        Ok((StatusCode::OK, ApiResponse::ok(result.conversation)))
    }
}

pub async fn list_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedQuery(query): ValidatedQuery<PaginationQuery>,
) -> Result<ApiResponse<Paginated<ConversationResponse>>, AppError> {
    let page = state.services.conversations.list(auth.id, query.pagination()).await?;
    Ok(ApiResponse::ok(page))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(conversation_id): PathId,
) -> Result<ApiResponse<ConversationResponse>, AppError> {
    let conversation = state.services.conversations.get(auth.id, conversation_id).await?;
    Ok(ApiResponse::ok(conversation))
}

pub async fn rename_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(conversation_id): PathId,
    ValidatedJson(body): ValidatedJson<UpdateConversationRequest>,
) -> Result<ApiResponse<ConversationResponse>, AppError> {
    let conversation = state
        .services
        .conversations
        .rename(auth.id, conversation_id, body)
        .await?;
    Ok(ApiResponse::ok(conversation).with_message("Conversation updated"))
}

pub async fn add_members(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(conversation_id): PathId,
    ValidatedJson(body): ValidatedJson<AddMembersRequest>,
) -> Result<ApiResponse<ConversationResponse>, AppError> {
    let conversation = state
        .services
        .conversations
        .add_members(auth.id, conversation_id, body)
        .await?;
    Ok(ApiResponse::ok(conversation).with_message("Members added"))
}

/// Remove a member, or leave when the member is the caller
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((conversation_id, member_id)): Path<(String, String)>,
) -> Result<ApiResponse, AppError> {
    let conversation_id = parse_path_id(&conversation_id, "id")?;
    let member_id = parse_path_id(&member_id, "userId")?;

    state
        .services
        .conversations
        .remove_member(auth.id, conversation_id, member_id)
        .await?;
    Ok(ApiResponse::message("Member removed"))
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(conversation_id): PathId,
) -> Result<ApiResponse, AppError> {
    state.services.conversations.delete(auth.id, conversation_id).await?;
    Ok(ApiResponse::message("Conversation deleted"))
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(conversation_id): PathId,
) -> Result<ApiResponse, AppError> {
    state.services.conversations.mark_read(auth.id, conversation_id).await?;
    Ok(ApiResponse::message("Conversation marked as read"))
}
