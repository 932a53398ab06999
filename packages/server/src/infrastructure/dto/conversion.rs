//! Conversion logic between DTOs and domain entities.

use kaiwa_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    entity::{
        MessageView, OnlineMember, ReactionCounts, Room, Stamp, UNKNOWN_AUTHOR, UnreadSnapshot,
    },
    event::ChatEvent,
};
use crate::infrastructure::dto::{http::RoomDetailDto, websocket as dto};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&OnlineMember> for dto::UserDto {
    fn from(member: &OnlineMember) -> Self {
        Self {
            id: member.user_id.value(),
            username: member.username.clone(),
            display_name: member.display_name.clone(),
            role: member.role.as_str().to_string(),
            role_icon: member.role.icon().to_string(),
        }
    }
}

impl From<ReactionCounts> for dto::ReactionCountsDto {
    fn from(counts: ReactionCounts) -> Self {
        Self {
            like: counts.likes,
            dislike: counts.dislikes,
        }
    }
}

impl From<Stamp> for dto::StampDto {
    fn from(stamp: Stamp) -> Self {
        Self {
            by: stamp.by.value(),
            at: timestamp_to_rfc3339(stamp.at.value()),
        }
    }
}

impl From<&MessageView> for dto::MessageDto {
    fn from(view: &MessageView) -> Self {
        let message = &view.message;
        let author = match &view.author {
            Some(user) => dto::AuthorDto {
                id: user.id.value(),
                username: user.username.clone(),
                display_name: user.display_name.clone(),
                role: user.role.as_str().to_string(),
                role_icon: user.role.icon().to_string(),
            },
            None => dto::AuthorDto {
                id: message.author_id.value(),
                username: String::new(),
                display_name: UNKNOWN_AUTHOR.to_string(),
                role: "user".to_string(),
                role_icon: String::new(),
            },
        };
        Self {
            id: message.id.value(),
            room: view.room_name.as_str().to_string(),
            content: message.content.clone(),
            author,
            created_at: timestamp_to_rfc3339(message.created_at.value()),
            reply_to: view.reply.as_ref().map(|reply| dto::ReplyDto {
                id: reply.id.value(),
                author_display_name: reply.author_display_name.clone(),
                snippet: reply.snippet.clone(),
            }),
            reactions: view.reactions.into(),
            my_reaction: view.my_reaction.map(|kind| kind.as_str().to_string()),
            is_deleted: message.is_deleted,
            edited: message.edited.map(Into::into),
            pinned: message.pinned.map(Into::into),
            forwarded: message.forwarded_from.map(|id| dto::ForwardedDto {
                original_message_id: id.value(),
            }),
        }
    }
}

fn messages(views: &[MessageView]) -> Vec<dto::MessageDto> {
    views.iter().map(dto::MessageDto::from).collect()
}

impl From<UnreadSnapshot> for dto::ServerMessage {
    fn from(snapshot: UnreadSnapshot) -> Self {
        dto::ServerMessage::UnreadInfo {
            unread_count: snapshot.unread_count,
            personal_count: snapshot.personal_count,
            last_read_at: timestamp_to_rfc3339(snapshot.last_read_at.value()),
        }
    }
}

impl From<&ChatEvent> for dto::ServerMessage {
    fn from(event: &ChatEvent) -> Self {
        match event {
            ChatEvent::NewMessage(view) => dto::ServerMessage::NewMessage {
                message: view.into(),
            },
            ChatEvent::MessagesHistory {
                messages: views,
                page,
                has_more,
            } => dto::ServerMessage::MessagesHistory {
                messages: messages(views),
                page: *page,
                has_more: *has_more,
            },
            ChatEvent::MoreMessages {
                messages: views,
                has_more,
            } => dto::ServerMessage::MoreMessages {
                messages: messages(views),
                has_more: *has_more,
            },
            ChatEvent::OnlineUsers(members) => dto::ServerMessage::OnlineUsers {
                users: members.iter().map(dto::UserDto::from).collect(),
            },
            ChatEvent::Typing { member, is_typing } => dto::ServerMessage::Typing {
                user: member.into(),
                is_typing: *is_typing,
            },
            ChatEvent::ReactionUpdated {
                message_id,
                counts,
                user_id,
                kind,
            } => dto::ServerMessage::ReactionUpdated {
                message_id: message_id.value(),
                reactions: (*counts).into(),
                user_id: user_id.value(),
                reaction: kind.as_str().to_string(),
            },
            ChatEvent::MessageEdited(view) => dto::ServerMessage::MessageEdited {
                message: view.into(),
            },
            ChatEvent::MessageDeleted {
                message_id,
                content,
                deleted_by,
            } => dto::ServerMessage::MessageDeleted {
                message_id: message_id.value(),
                content: content.clone(),
                deleted_by: deleted_by.value(),
            },
            ChatEvent::MessageForwarded(view) => dto::ServerMessage::MessageForwarded {
                message: view.into(),
            },
            ChatEvent::MessagePinned {
                message_id,
                pinned_by,
                pinned_at,
            } => dto::ServerMessage::MessagePinned {
                message_id: message_id.value(),
                pinned_by: pinned_by.value(),
                pinned_at: timestamp_to_rfc3339(pinned_at.value()),
            },
            ChatEvent::MessageUnpinned {
                message_id,
                unpinned_by,
            } => dto::ServerMessage::MessageUnpinned {
                message_id: message_id.value(),
                unpinned_by: unpinned_by.value(),
            },
            ChatEvent::UnreadInfo(snapshot) => (*snapshot).into(),
            ChatEvent::UserJoined(member) => dto::ServerMessage::UserJoined {
                user: member.into(),
            },
            ChatEvent::UserLeft(member) => dto::ServerMessage::UserLeft {
                user: member.into(),
            },
            ChatEvent::HistoryCleared { cleared_by } => dto::ServerMessage::HistoryCleared {
                cleared_by: cleared_by.value(),
            },
            ChatEvent::RoomMuted {
                is_muted,
                changed_by,
            } => dto::ServerMessage::RoomMuted {
                is_muted: *is_muted,
                changed_by: changed_by.value(),
            },
            ChatEvent::Error { message } => dto::ServerMessage::Error {
                message: message.clone(),
            },
        }
    }
}

impl RoomDetailDto {
    pub fn new(room: &Room, online_users: usize) -> Self {
        Self {
            name: room.name.as_str().to_string(),
            kind: room.kind.as_str().to_string(),
            display_name: room.display_name(),
            is_muted: room.is_muted,
            history_cleared: room.history_cleared,
            created_at: timestamp_to_rfc3339(room.created_at.value()),
            online_users,
        }
    }
}
