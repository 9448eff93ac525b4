use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::Result,
    middleware::auth::Claims,
    realtime::hub::{conversation_room, ServerEvent},
    services::message_service::SendMessage,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct GetOrCreateConversationPayload {
    pub application_id: Uuid,
}

#[axum::debug_handler]
pub async fn get_or_create_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<GetOrCreateConversationPayload>,
) -> Result<impl IntoResponse> {
    let conversation = state
        .conversation_service
        .get_or_create(payload.application_id, claims.user_id()?)
        .await?;
    Ok(Json(json!({"success": true, "data": conversation})))
}

#[axum::debug_handler]
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let conversations = state
        .conversation_service
        .list_for_user(claims.user_id()?)
        .await?;
    Ok(Json(json!({
        "success": true,
        "count": conversations.len(),
        "data": conversations,
    })))
}

/// Fetching the backlog doubles as the read receipt: unread messages from
/// the other side flip to read and the caller's counter resets.
#[axum::debug_handler]
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let messages = state
        .message_service
        .list_and_mark_read(id, claims.user_id()?)
        .await?;
    Ok(Json(json!({
        "success": true,
        "count": messages.len(),
        "data": messages,
    })))
}

#[axum::debug_handler]
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SendMessage>,
) -> Result<impl IntoResponse> {
    let sender_id = claims.user_id()?;
    let conversation_id = payload.conversation_id;
    let message = state.message_service.send(sender_id, payload).await?;

    // Live fan-out happens after the write commits; the sender already
    // holds the message from the response, so their connections are
    // skipped.
    state.hub.broadcast_except_user(
        &conversation_room(conversation_id),
        ServerEvent::NewMessage {
            conversation_id,
            message: serde_json::to_value(&message)?,
        },
        Some(sender_id),
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "data": message})),
    ))
}

#[axum::debug_handler]
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.message_service.delete(id, claims.user_id()?).await?;
    Ok(Json(json!({"success": true, "message": "Message deleted"})))
}
