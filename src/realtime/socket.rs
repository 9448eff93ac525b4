use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::auth::verify_token;
use crate::realtime::hub::{conversation_room, ServerEvent};
use crate::services::message_service::SendMessage;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// Events a client may push over the socket. Unknown or malformed frames
/// are dropped without closing the connection.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ClientEvent {
    JoinConversation { conversation_id: Uuid },
    LeaveConversation { conversation_id: Uuid },
    SendMessage(SendMessage),
    Typing { conversation_id: Uuid },
    StopTyping { conversation_id: Uuid },
}

/// `/ws?token=<jwt>`. The token is checked before the upgrade completes;
/// a missing or invalid token never reaches event handling.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let claims = query.token.as_deref().and_then(verify_token);
    let Some(claims) = claims else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let Ok(user_id) = claims.user_id() else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: Uuid) {
    let (mut sink, mut stream) = socket.split();
    let (conn_id, mut rx) = state.hub.connect(user_id);
    tracing::debug!(%user_id, %conn_id, "websocket connected");

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = stream.next().await {
        let text = match frame {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => break,
            _ => continue,
        };
        let Ok(event) = serde_json::from_str::<ClientEvent>(&text) else {
            continue;
        };
        handle_event(&state, conn_id, user_id, event).await;
    }

    state.hub.disconnect(conn_id);
    send_task.abort();
    tracing::debug!(%user_id, %conn_id, "websocket disconnected");
}

async fn handle_event(state: &AppState, conn_id: Uuid, user_id: Uuid, event: ClientEvent) {
    match event {
        ClientEvent::JoinConversation { conversation_id } => {
            match state
                .conversation_service
                .is_participant(conversation_id, user_id)
                .await
            {
                Ok(true) => state.hub.join_room(conn_id, &conversation_room(conversation_id)),
                Ok(false) => {
                    tracing::warn!(%user_id, %conversation_id, "join refused, not a participant")
                }
                Err(err) => tracing::error!(%conversation_id, "join check failed: {err}"),
            }
        }
        ClientEvent::LeaveConversation { conversation_id } => {
            state.hub.leave_room(conn_id, &conversation_room(conversation_id));
        }
        ClientEvent::SendMessage(payload) => {
            let conversation_id = payload.conversation_id;
            match state.message_service.send(user_id, payload).await {
                Ok(view) => {
                    let Ok(message) = serde_json::to_value(&view) else {
                        return;
                    };
                    state.hub.broadcast_except_conn(
                        &conversation_room(conversation_id),
                        ServerEvent::NewMessage {
                            conversation_id,
                            message,
                        },
                        Some(conn_id),
                    );
                }
                Err(err) => tracing::warn!(%conversation_id, "socket send rejected: {err}"),
            }
        }
        ClientEvent::Typing { conversation_id } => {
            state.hub.broadcast_except_conn(
                &conversation_room(conversation_id),
                ServerEvent::UserTyping {
                    conversation_id,
                    user_id,
                },
                Some(conn_id),
            );
        }
        ClientEvent::StopTyping { conversation_id } => {
            state.hub.broadcast_except_conn(
                &conversation_room(conversation_id),
                ServerEvent::UserStopTyping {
                    conversation_id,
                    user_id,
                },
                Some(conn_id),
            );
        }
    }
}
