//! Presence wire messages.
//!
//! JSON encoding only; moving the bytes is the host's job.

use crate::color::Rgba;
use crate::presence::{ActorId, CursorUpdate, Presence};
use crate::store::{BoardId, Participant};
use kurbo::Point;
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Messages sent to the presence relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a board
    Join { board: BoardId, actor: Participant },
    /// Leave the current board
    Leave,
    /// Local cursor position (screen coordinates)
    Cursor { x: f64, y: f64 },
}

/// Messages received from the presence relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// An actor joined the board
    ActorJoined { actor: Participant },
    /// An actor left the board
    ActorLeft { actor_id: ActorId },
    /// Cursor update from another actor
    Cursor {
        actor_id: ActorId,
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<Rgba>,
    },
    /// Error message
    Error { message: String },
}

impl ClientMessage {
    pub fn cursor(position: Point) -> Self {
        ClientMessage::Cursor {
            x: position.x,
            y: position.y,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerMessage {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Fold this message into the presence model.
    pub fn apply(&self, presence: &mut Presence, at: Instant) {
        match self {
            ServerMessage::ActorJoined { actor } => {
                presence.touch(&actor.id, Some(&actor.name), Some(actor.color), at);
            }
            ServerMessage::ActorLeft { actor_id } => {
                presence.remove_actor(actor_id);
            }
            ServerMessage::Cursor {
                actor_id,
                x,
                y,
                name,
                color,
            } => {
                let update = CursorUpdate {
                    actor_id: actor_id.clone(),
                    name: name.clone(),
                    color: *color,
                    position: Point::new(*x, *y),
                };
                presence.upsert_cursor(&update, at);
            }
            ServerMessage::Error { message } => {
                log::warn!("Presence relay error: {message}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;

    #[test]
    fn test_client_cursor_encoding() {
        let json = ClientMessage::cursor(Point::new(12.5, 40.0)).to_json().unwrap();
        assert_eq!(json, r#"{"type":"cursor","x":12.5,"y":40.0}"#);
        assert_eq!(ClientMessage::Leave.to_json().unwrap(), r#"{"type":"leave"}"#);
    }

    #[test]
    fn test_join_encoding() {
        let board = uuid::Uuid::nil();
        let message = ClientMessage::Join {
            board,
            actor: Participant {
                id: "u1".into(),
                name: "Ada".into(),
                color: Rgba::rgb(0x5B, 0x4C, 0xFF),
            },
        };
        let value: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "join");
        assert_eq!(value["actor"]["color"], "#5B4CFF");
    }

    #[test]
    fn test_server_messages_drive_presence() {
        let mut presence = Presence::new("me", &SessionConfig::default());
        let now = Instant::now();

        ServerMessage::from_json(r##"{"type":"actor_joined","actor":{"id":"u2","name":"Bo","color":"#FF6B6B"}}"##)
            .unwrap()
            .apply(&mut presence, now);
        assert_eq!(presence.get("u2").unwrap().name, "Bo");
        assert!(presence.visible_cursors().is_empty());

        ServerMessage::from_json(r#"{"type":"cursor","actor_id":"u2","x":5.0,"y":6.0}"#)
            .unwrap()
            .apply(&mut presence, now);
        assert_eq!(presence.visible_cursors()[0].cursor, Some(Point::new(5.0, 6.0)));
        assert_eq!(presence.get("u2").unwrap().color, Rgba::rgb(0xFF, 0x6B, 0x6B));

        ServerMessage::from_json(r#"{"type":"actor_left","actor_id":"u2"}"#)
            .unwrap()
            .apply(&mut presence, now);
        assert!(presence.is_empty());
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(ServerMessage::from_json(r#"{"type":"teleport"}"#).is_err());
    }
}
