// ============================
// chat-backend-lib/src/events.rs
// ============================
//! Wire protocol: every WebSocket frame is a JSON envelope
//! `{"type": ..., "payload": ...}`.

use chat_common::{Message, MessageId, User};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Events received from clients.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ClientEvent {
    /// A batch of messages for one room.
    #[serde(rename_all = "camelCase")]
    ClientMessages {
        room_id: String,
        messages: Vec<ClientMessage>,
    },
    /// Request for messages older than `first_message_id`.
    #[serde(rename_all = "camelCase")]
    RequestRoomHistory {
        room_id: String,
        first_message_id: MessageId,
    },
}

/// A message as submitted by a client; the server assigns id and timestamp.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClientMessage {
    pub content: String,
}

/// Events pushed to clients.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Sent exactly once, as the first frame after authentication.
    #[serde(rename_all = "camelCase")]
    Hello { me: User, rooms: Vec<RoomSnapshot> },

    /// Broadcast of a durably appended batch.
    #[serde(rename_all = "camelCase")]
    ServerMessages {
        room_id: String,
        messages: Vec<Message>,
    },

    /// Reply to a history request; sent only to the requester.
    #[serde(rename_all = "camelCase")]
    RoomHistory {
        room_id: String,
        messages: Vec<Message>,
        has_more_messages: bool,
    },

    /// Per-request rejection.
    Error { id: String, message: String },
}

/// One room entry in the hello event: catalog data plus recent history.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: String,
    pub name: String,
    /// Most-recent messages, newest first
    pub messages: Vec<Message>,
    pub has_more_messages: bool,
}

impl ServerEvent {
    /// Build the `error` event for a rejected request.
    pub fn from_error(err: &ChatError) -> Self {
        ServerEvent::Error {
            id: err.error_code().to_string(),
            message: err.to_string(),
        }
    }

    /// Serialize to the wire form. The envelope shape is fixed, so failures
    /// can only come from pathological payloads.
    pub fn to_json(&self) -> Result<String, ChatError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_common::MessageId;

    fn sample_message() -> Message {
        Message {
            id: MessageId::new(1000, 0),
            timestamp: 1000,
            content: "hi".to_string(),
            user: User {
                id: "u1".to_string(),
                username: "alice".to_string(),
            },
        }
    }

    #[test]
    fn test_parse_client_messages_event() {
        let raw = r#"{
            "type": "clientMessages",
            "payload": {
                "roomId": "wasm",
                "messages": [{"content": "hi"}, {"content": "there"}]
            }
        }"#;

        let evt: ClientEvent = serde_json::from_str(raw).unwrap();
        match evt {
            ClientEvent::ClientMessages { room_id, messages } => {
                assert_eq!(room_id, "wasm");
                assert_eq!(messages.len(), 2);
                assert_eq!(messages[0].content, "hi");
            },
            other => panic!("Expected ClientMessages, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_request_room_history_event() {
        let raw = r#"{
            "type": "requestRoomHistory",
            "payload": {"roomId": "db", "firstMessageId": "1696000000123-7"}
        }"#;

        let evt: ClientEvent = serde_json::from_str(raw).unwrap();
        match evt {
            ClientEvent::RequestRoomHistory {
                room_id,
                first_message_id,
            } => {
                assert_eq!(room_id, "db");
                assert_eq!(first_message_id, MessageId::new(1_696_000_000_123, 7));
            },
            other => panic!("Expected RequestRoomHistory, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let raw = r#"{"type": "presence", "payload": {}}"#;
        assert!(serde_json::from_str::<ClientEvent>(raw).is_err());
    }

    #[test]
    fn test_hello_event_wire_shape() {
        let evt = ServerEvent::Hello {
            me: User {
                id: "u1".to_string(),
                username: "alice".to_string(),
            },
            rooms: vec![RoomSnapshot {
                id: "beast".to_string(),
                name: "Boost.Beast".to_string(),
                messages: vec![sample_message()],
                has_more_messages: false,
            }],
        };

        let json: serde_json::Value = serde_json::from_str(&evt.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "hello");
        assert_eq!(json["payload"]["me"]["username"], "alice");
        let room = &json["payload"]["rooms"][0];
        assert_eq!(room["id"], "beast");
        assert_eq!(room["name"], "Boost.Beast");
        assert_eq!(room["hasMoreMessages"], false);
        assert_eq!(room["messages"][0]["id"], "1000-0");
    }

    #[test]
    fn test_server_messages_wire_shape() {
        let evt = ServerEvent::ServerMessages {
            room_id: "wasm".to_string(),
            messages: vec![sample_message()],
        };

        let json: serde_json::Value = serde_json::from_str(&evt.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "serverMessages");
        assert_eq!(json["payload"]["roomId"], "wasm");
        assert_eq!(json["payload"]["messages"][0]["content"], "hi");
        assert_eq!(json["payload"]["messages"][0]["user"]["id"], "u1");
    }

    #[test]
    fn test_error_event_wire_shape() {
        let evt = ServerEvent::from_error(&ChatError::UnknownRoom("lobby".to_string()));
        let json: serde_json::Value = serde_json::from_str(&evt.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["payload"]["id"], "UNKNOWN_ROOM");
    }
}
