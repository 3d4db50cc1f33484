//! Message Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use crate::application::dto::request::{EditMessageRequest, PaginationQuery, ReactionRequest, SendMessageRequest};
use crate::application::dto::response::{MessageResponse, Paginated};
use crate::presentation::http::extractors::{parse_path_id, AuthUser, PathId, ValidatedJson, ValidatedQuery};
use crate::shared::error::AppError;
use crate::shared::response::{created, ApiResponse};
use crate::startup::AppState;

/// Send message to a conversation
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(conversation_id): PathId,
    ValidatedJson(body): ValidatedJson<SendMessageRequest>,
) -> Result<(StatusCode, ApiResponse<MessageResponse>), AppError> {
    let message = state.services.messages.send(auth.id, conversation_id, body).await?;
    Ok(created(message, "Message sent"))
}

/// Messages of a conversation, newest first
pub async fn get_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(conversation_id): PathId,
    ValidatedQuery(query): ValidatedQuery<PaginationQuery>,
) -> Result<ApiResponse<Paginated<MessageResponse>>, AppError> {
    let page = state
        .services
        .messages
        .list(auth.id, conversation_id, query.pagination())
        .await?;
    Ok(ApiResponse::ok(page))
}

pub async fn edit_message(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(message_id): PathId,
    ValidatedJson(body): ValidatedJson<EditMessageRequest>,
) -> Result<ApiResponse<MessageResponse>, AppError> {
    let message = state.services.messages.edit(auth.id, message_id, body).await?;
    Ok(ApiResponse::ok(message).with_message("Message updated"))
}

pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(message_id): PathId,
) -> Result<ApiResponse, AppError> {
    state.services.messages.delete(auth.id, message_id).await?;
    Ok(ApiResponse::message("Message deleted"))
}

pub async fn add_reaction(
    State(state): State<AppState>,
    auth: AuthUser,
    PathId(message_id): PathId,
    ValidatedJson(body): ValidatedJson<ReactionRequest>,
) -> Result<ApiResponse<MessageResponse>, AppError> {
    let message = state.services.messages.react(auth.id, message_id, body).await?;
    Ok(ApiResponse::ok(message))
}

pub async fn remove_reaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((message_id, emoji)): Path<(String, String)>,
) -> Result<ApiResponse<MessageResponse>, AppError> {
    let message_id = parse_path_id(&message_id, "id")?;
    let message = state.services.messages.unreact(auth.id, message_id, &emoji).await?;
    Ok(ApiResponse::ok(message))
}
