use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Events pushed to connected clients. Serialized with an `event` tag so
/// the wire names match the protocol: new_message, user_typing,
/// user_stop_typing.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    NewMessage {
        conversation_id: Uuid,
        message: JsonValue,
    },
    UserTyping {
        conversation_id: Uuid,
        user_id: Uuid,
    },
    UserStopTyping {
        conversation_id: Uuid,
        user_id: Uuid,
    },
}

struct Connection {
    user_id: Uuid,
    tx: mpsc::UnboundedSender<ServerEvent>,
    rooms: HashSet<String>,
}

#[derive(Default)]
struct HubInner {
    connections: HashMap<Uuid, Connection>,
    rooms: HashMap<String, HashSet<Uuid>>,
}

/// In-memory room registry for the realtime delivery channel. Delivery is
/// best-effort on top of persistence: a participant who is not connected
/// or not subscribed simply misses the live event and catches up via the
/// REST backlog.
#[derive(Default)]
pub struct RealtimeHub {
    inner: RwLock<HubInner>,
}

pub fn user_room(user_id: Uuid) -> String {
    format!("user:{}", user_id)
}

pub fn conversation_room(conversation_id: Uuid) -> String {
    conversation_id.to_string()
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and place it in the user's private room.
    /// Returns the connection id and the receiving half the socket task
    /// drains.
    pub fn connect(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<ServerEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        let private = user_room(user_id);

        let mut inner = self.inner.write().expect("hub lock poisoned");
        inner.connections.insert(
            conn_id,
            Connection {
                user_id,
                tx,
                rooms: HashSet::from([private.clone()]),
            },
        );
        inner.rooms.entry(private).or_default().insert(conn_id);
        (conn_id, rx)
    }

    /// Silent cleanup: drop the connection and all of its room
    /// memberships. No replay is attempted.
    pub fn disconnect(&self, conn_id: Uuid) {
        let mut inner = self.inner.write().expect("hub lock poisoned");
        let Some(connection) = inner.connections.remove(&conn_id) else {
            return;
        };
        for room in connection.rooms {
            if let Some(members) = inner.rooms.get_mut(&room) {
                members.remove(&conn_id);
                if members.is_empty() {
                    inner.rooms.remove(&room);
                }
            }
        }
    }

    pub fn join_room(&self, conn_id: Uuid, room: &str) {
        let mut inner = self.inner.write().expect("hub lock poisoned");
        let inner = &mut *inner;
        if let Some(connection) = inner.connections.get_mut(&conn_id) {
            connection.rooms.insert(room.to_string());
            inner.rooms.entry(room.to_string()).or_default().insert(conn_id);
        }
    }

    pub fn leave_room(&self, conn_id: Uuid, room: &str) {
        let mut inner = self.inner.write().expect("hub lock poisoned");
        if let Some(connection) = inner.connections.get_mut(&conn_id) {
            connection.rooms.remove(room);
        }
        if let Some(members) = inner.rooms.get_mut(room) {
            members.remove(&conn_id);
            if members.is_empty() {
                inner.rooms.remove(room);
            }
        }
    }

    /// Fan out to every connection in the room except the originating
    /// connection. Send failures mean the receiver task is gone; the
    /// disconnect path cleans those up.
    pub fn broadcast_except_conn(&self, room: &str, event: ServerEvent, exclude: Option<Uuid>) {
        let inner = self.inner.read().expect("hub lock poisoned");
        let Some(members) = inner.rooms.get(room) else {
            return;
        };
        for conn_id in members {
            if Some(*conn_id) == exclude {
                continue;
            }
            if let Some(connection) = inner.connections.get(conn_id) {
                let _ = connection.tx.send(event.clone());
            }
        }
    }

    /// Fan out to a room, skipping every connection owned by the given
    /// user. Used by the REST send path so the author does not echo the
    /// message back to themselves.
    pub fn broadcast_except_user(&self, room: &str, event: ServerEvent, exclude_user: Option<Uuid>) {
        let inner = self.inner.read().expect("hub lock poisoned");
        let Some(members) = inner.rooms.get(room) else {
            return;
        };
        for conn_id in members {
            if let Some(connection) = inner.connections.get(conn_id) {
                if Some(connection.user_id) == exclude_user {
                    continue;
                }
                let _ = connection.tx.send(event.clone());
            }
        }
    }

    #[cfg(test)]
    fn room_size(&self, room: &str) -> usize {
        let inner = self.inner.read().expect("hub lock poisoned");
        inner.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn typing(conversation_id: Uuid, user_id: Uuid) -> ServerEvent {
        ServerEvent::UserTyping {
            conversation_id,
            user_id,
        }
    }

    #[test]
    fn connect_joins_private_room() {
        let hub = RealtimeHub::new();
        let user = Uuid::new_v4();
        let (_conn, mut rx) = hub.connect(user);

        hub.broadcast_except_conn(&user_room(user), typing(Uuid::new_v4(), user), None);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn room_broadcast_excludes_sender_connection() {
        let hub = RealtimeHub::new();
        let (alice_conn, mut alice_rx) = hub.connect(Uuid::new_v4());
        let (bob_conn, mut bob_rx) = hub.connect(Uuid::new_v4());

        let conversation = Uuid::new_v4();
        let room = conversation_room(conversation);
        hub.join_room(alice_conn, &room);
        hub.join_room(bob_conn, &room);

        hub.broadcast_except_conn(&room, typing(conversation, Uuid::new_v4()), Some(alice_conn));

        assert!(alice_rx.try_recv().is_err());
        assert!(bob_rx.try_recv().is_ok());
    }

    #[test]
    fn broadcast_except_user_skips_all_of_their_connections() {
        let hub = RealtimeHub::new();
        let sender = Uuid::new_v4();
        let (phone, mut phone_rx) = hub.connect(sender);
        let (laptop, mut laptop_rx) = hub.connect(sender);
        let (other_conn, mut other_rx) = hub.connect(Uuid::new_v4());

        let conversation = Uuid::new_v4();
        let room = conversation_room(conversation);
        for conn in [phone, laptop, other_conn] {
            hub.join_room(conn, &room);
        }

        hub.broadcast_except_user(
            &room,
            ServerEvent::NewMessage {
                conversation_id: conversation,
                message: json!({"content": "hi"}),
            },
            Some(sender),
        );

        assert!(phone_rx.try_recv().is_err());
        assert!(laptop_rx.try_recv().is_err());
        assert!(other_rx.try_recv().is_ok());
    }

    #[test]
    fn leave_room_stops_delivery() {
        let hub = RealtimeHub::new();
        let (conn, mut rx) = hub.connect(Uuid::new_v4());
        let conversation = Uuid::new_v4();
        let room = conversation_room(conversation);

        hub.join_room(conn, &room);
        hub.leave_room(conn, &room);
        hub.broadcast_except_conn(&room, typing(conversation, Uuid::new_v4()), None);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disconnect_discards_room_memberships() {
        let hub = RealtimeHub::new();
        let user = Uuid::new_v4();
        let (conn, _rx) = hub.connect(user);
        let room = conversation_room(Uuid::new_v4());
        hub.join_room(conn, &room);

        hub.disconnect(conn);

        assert_eq!(hub.room_size(&room), 0);
        assert_eq!(hub.room_size(&user_room(user)), 0);
    }

    #[test]
    fn event_wire_names_match_protocol() {
        let event = typing(Uuid::new_v4(), Uuid::new_v4());
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "user_typing");

        let event = ServerEvent::NewMessage {
            conversation_id: Uuid::new_v4(),
            message: json!({}),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "new_message");
    }
}
