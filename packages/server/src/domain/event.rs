//! Events delivered to live connections.
//!
//! Use cases describe what happened with [`ChatEvent`]; the pusher
//! implementation owns the wire encoding.

use super::{
    entity::{MessageView, OnlineMember, ReactionCounts, UnreadSnapshot},
    value_object::{MessageId, ReactionKind, Timestamp, UserId},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    NewMessage(MessageView),
    MessagesHistory {
        messages: Vec<MessageView>,
        page: u32,
        has_more: bool,
    },
    MoreMessages {
        messages: Vec<MessageView>,
        has_more: bool,
    },
    OnlineUsers(Vec<OnlineMember>),
    Typing {
        member: OnlineMember,
        is_typing: bool,
    },
    ReactionUpdated {
        message_id: MessageId,
        counts: ReactionCounts,
        user_id: UserId,
        kind: ReactionKind,
    },
    MessageEdited(MessageView),
    MessageDeleted {
        message_id: MessageId,
        content: String,
        deleted_by: UserId,
    },
    MessageForwarded(MessageView),
    MessagePinned {
        message_id: MessageId,
        pinned_by: UserId,
        pinned_at: Timestamp,
    },
    MessageUnpinned {
        message_id: MessageId,
        unpinned_by: UserId,
    },
    UnreadInfo(UnreadSnapshot),
    UserJoined(OnlineMember),
    UserLeft(OnlineMember),
    HistoryCleared {
        cleared_by: UserId,
    },
    RoomMuted {
        is_muted: bool,
        changed_by: UserId,
    },
    Error {
        message: String,
    },
}

impl ChatEvent {
    /// Wire discriminant, used for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatEvent::NewMessage(_) => "new_message",
            ChatEvent::MessagesHistory { .. } => "messages_history",
            ChatEvent::MoreMessages { .. } => "more_messages",
            ChatEvent::OnlineUsers(_) => "online_users",
            ChatEvent::Typing { .. } => "typing",
            ChatEvent::ReactionUpdated { .. } => "reaction_updated",
            ChatEvent::MessageEdited(_) => "message_edited",
            ChatEvent::MessageDeleted { .. } => "message_deleted",
            ChatEvent::MessageForwarded(_) => "message_forwarded",
            ChatEvent::MessagePinned { .. } => "message_pinned",
            ChatEvent::MessageUnpinned { .. } => "message_unpinned",
            ChatEvent::UnreadInfo(_) => "unread_info",
            ChatEvent::UserJoined(_) => "user_joined",
            ChatEvent::UserLeft(_) => "user_left",
            ChatEvent::HistoryCleared { .. } => "history_cleared",
            ChatEvent::RoomMuted { .. } => "room_muted",
            ChatEvent::Error { .. } => "error",
        }
    }
}
