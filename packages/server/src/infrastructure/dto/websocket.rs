//! WebSocket envelope DTOs.
//!
//! Every envelope is a JSON object with a `type` discriminant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ========================================
// Inbound (client → server)
// ========================================

/// Envelope types accepted from clients.
pub const CLIENT_MESSAGE_TYPES: [&str; 15] = [
    "message",
    "fetch_messages",
    "fetch_online_users",
    "typing",
    "reaction",
    "edit_message",
    "delete_message",
    "forward_message",
    "pin_message",
    "unpin_message",
    "mark_as_read",
    "load_more_messages",
    "get_unread_info",
    "clear_history",
    "set_muted",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Message {
        message: String,
        #[serde(default)]
        reply_to_id: Option<i64>,
    },
    FetchMessages {
        #[serde(default)]
        page: Option<u32>,
    },
    FetchOnlineUsers {},
    Typing {
        is_typing: bool,
    },
    Reaction {
        message_id: i64,
        reaction: String,
    },
    EditMessage {
        message_id: i64,
        new_content: String,
    },
    DeleteMessage {
        message_id: i64,
    },
    ForwardMessage {
        message_id: i64,
        target_room: String,
        #[serde(default)]
        custom_message: Option<String>,
    },
    PinMessage {
        message_id: i64,
    },
    UnpinMessage {
        message_id: i64,
    },
    MarkAsRead {
        #[serde(default)]
        message_id: Option<i64>,
        #[serde(default)]
        up_to_time: Option<String>,
    },
    LoadMoreMessages {
        #[serde(default)]
        before_message_id: Option<i64>,
    },
    GetUnreadInfo {},
    ClearHistory {},
    SetMuted {
        muted: bool,
    },
}

/// Why an inbound frame could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    Malformed(String),

    #[error("unknown envelope type: '{0}'")]
    UnknownType(String),
}

impl ClientMessage {
    /// Decode a text frame, telling unknown types apart from malformed envelopes.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => Ok(message),
            Err(err) => {
                let value: serde_json::Value = serde_json::from_str(text)
                    .map_err(|e| DecodeError::Malformed(e.to_string()))?;
                match value.get("type").and_then(|t| t.as_str()) {
                    Some(kind) if !CLIENT_MESSAGE_TYPES.contains(&kind) => {
                        Err(DecodeError::UnknownType(kind.to_string()))
                    }
                    _ => Err(DecodeError::Malformed(err.to_string())),
                }
            }
        }
    }
}

// ========================================
// Outbound (server → client / group)
// ========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorDto {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub role_icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyDto {
    pub id: i64,
    pub author_display_name: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCountsDto {
    pub like: i64,
    pub dislike: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampDto {
    pub by: i64,
    /// RFC 3339
    pub at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardedDto {
    pub original_message_id: i64,
}

/// A serialized message as seen by one viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: i64,
    pub room: String,
    pub content: String,
    pub author: AuthorDto,
    /// RFC 3339
    pub created_at: String,
    pub reply_to: Option<ReplyDto>,
    pub reactions: ReactionCountsDto,
    pub my_reaction: Option<String>,
    pub is_deleted: bool,
    pub edited: Option<StampDto>,
    pub pinned: Option<StampDto>,
    pub forwarded: Option<ForwardedDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub role_icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    NewMessage {
        message: MessageDto,
    },
    MessagesHistory {
        messages: Vec<MessageDto>,
        page: u32,
        has_more: bool,
    },
    MoreMessages {
        messages: Vec<MessageDto>,
        has_more: bool,
    },
    OnlineUsers {
        users: Vec<UserDto>,
    },
    Typing {
        user: UserDto,
        is_typing: bool,
    },
    ReactionUpdated {
        message_id: i64,
        reactions: ReactionCountsDto,
        user_id: i64,
        reaction: String,
    },
    MessageEdited {
        message: MessageDto,
    },
    MessageDeleted {
        message_id: i64,
        content: String,
        deleted_by: i64,
    },
    MessageForwarded {
        message: MessageDto,
    },
    MessagePinned {
        message_id: i64,
        pinned_by: i64,
        pinned_at: String,
    },
    MessageUnpinned {
        message_id: i64,
        unpinned_by: i64,
    },
    UnreadInfo {
        unread_count: i64,
        personal_count: i64,
        last_read_at: String,
    },
    UserJoined {
        user: UserDto,
    },
    UserLeft {
        user: UserDto,
    },
    HistoryCleared {
        cleared_by: i64,
    },
    RoomMuted {
        is_muted: bool,
        changed_by: i64,
    },
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_message_with_optional_reply() {
        // テスト項目: reply_to_id は省略可能
        // given (前提条件):
        let with_reply = r#"{"type":"message","message":"hi","reply_to_id":3}"#;
        let without_reply = r#"{"type":"message","message":"hi"}"#;

        // when (操作):
        let a = ClientMessage::decode(with_reply).unwrap();
        let b = ClientMessage::decode(without_reply).unwrap();

        // then (期待する結果):
        assert_eq!(
            a,
            ClientMessage::Message {
                message: "hi".to_string(),
                reply_to_id: Some(3)
            }
        );
        assert_eq!(
            b,
            ClientMessage::Message {
                message: "hi".to_string(),
                reply_to_id: None
            }
        );
    }

    #[test]
    fn test_decode_field_less_envelopes() {
        // テスト項目: フィールドを持たないエンベロープも解釈できる
        assert_eq!(
            ClientMessage::decode(r#"{"type":"fetch_online_users"}"#),
            Ok(ClientMessage::FetchOnlineUsers {})
        );
        assert_eq!(
            ClientMessage::decode(r#"{"type":"mark_as_read"}"#),
            Ok(ClientMessage::MarkAsRead {
                message_id: None,
                up_to_time: None
            })
        );
    }

    #[test]
    fn test_decode_set_muted_requires_flag() {
        // テスト項目: set_muted は muted フラグが必須
        assert_eq!(
            ClientMessage::decode(r#"{"type":"set_muted","muted":true}"#),
            Ok(ClientMessage::SetMuted { muted: true })
        );
        assert!(matches!(
            ClientMessage::decode(r#"{"type":"set_muted"}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_distinguishes_unknown_type_from_malformed() {
        // テスト項目: 未知の type と壊れたエンベロープを区別する
        assert_eq!(
            ClientMessage::decode(r#"{"type":"dance","speed":3}"#),
            Err(DecodeError::UnknownType("dance".to_string()))
        );
        assert!(matches!(
            ClientMessage::decode(r#"{"type":"reaction","message_id":"x"}"#),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            ClientMessage::decode("not json"),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            ClientMessage::decode(r#"{"no_type":true}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_server_message_is_tagged() {
        // テスト項目: 送信エンベロープは type フィールドを持つ
        let json = serde_json::to_value(ServerMessage::UnreadInfo {
            unread_count: 2,
            personal_count: 1,
            last_read_at: "2024-01-01T00:00:00+00:00".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "unread_info");
        assert_eq!(json["unread_count"], 2);
        assert_eq!(json["personal_count"], 1);
    }
}
