//! Entities and read models of the chat domain.

use super::value_object::{
    MessageContent, MessageId, ReactionKind, Role, RoomId, RoomKind, RoomName, Timestamp, UserId,
};

/// Placeholder body of a soft-deleted message.
pub const TOMBSTONE: &str = "This message was deleted";

/// Maximum characters kept in a reply snippet before the ellipsis.
pub const SNIPPET_CHARS: usize = 100;

/// Shown in place of an author whose identity record is gone.
pub const UNKNOWN_AUTHOR: &str = "Unknown user";

/// A user as exposed by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

impl User {
    /// Role- or participant-derived membership of a room kind.
    pub fn may_enter(&self, kind: RoomKind) -> bool {
        match kind {
            RoomKind::General | RoomKind::Discussion => true,
            RoomKind::Vip => self.role == Role::Vip || self.role.is_elevated(),
            RoomKind::Moderators => self.role.is_elevated(),
            RoomKind::Direct { first, second } => self.id == first || self.id == second,
        }
    }
}

/// A communication channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub name: RoomName,
    pub kind: RoomKind,
    pub is_muted: bool,
    pub history_cleared: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Room {
    pub fn display_name(&self) -> String {
        match self.kind {
            RoomKind::General => "General".to_string(),
            RoomKind::Vip => "VIP lounge".to_string(),
            RoomKind::Moderators => "Moderators".to_string(),
            RoomKind::Direct { .. } => "Private thread".to_string(),
            RoomKind::Discussion => self.name.as_str().to_string(),
        }
    }
}

/// Who changed a message and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    pub by: UserId,
    pub at: Timestamp,
}

/// Content posted to a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub author_id: UserId,
    pub content: String,
    pub parent_id: Option<MessageId>,
    pub is_deleted: bool,
    pub edited: Option<Stamp>,
    pub pinned: Option<Stamp>,
    pub forwarded_from: Option<MessageId>,
    pub created_at: Timestamp,
}

impl Message {
    pub fn is_forwarded(&self) -> bool {
        self.forwarded_from.is_some()
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned.is_some()
    }
}

/// Insert payload for a new message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub room_id: RoomId,
    pub author_id: UserId,
    pub content: MessageContent,
    pub parent_id: Option<MessageId>,
    pub forwarded_from: Option<MessageId>,
    pub created_at: Timestamp,
}

/// A single irrevocable reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaction {
    pub message_id: MessageId,
    pub user_id: UserId,
    pub kind: ReactionKind,
    pub created_at: Timestamp,
}

/// Aggregate reaction counts of one message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReactionCounts {
    pub likes: i64,
    pub dislikes: i64,
}

/// Per (user, room) read cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserChatPosition {
    pub user_id: UserId,
    pub room_id: RoomId,
    pub last_read_at: Timestamp,
    pub last_read_message_id: Option<MessageId>,
    pub cached_unread: i64,
    pub cached_personal: i64,
    pub updated_at: Timestamp,
}

/// Unread message projected for personal notification matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadCandidate {
    pub id: MessageId,
    pub content: String,
    pub parent_author_id: Option<UserId>,
}

/// Freshly computed counters reported to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnreadSnapshot {
    pub unread_count: i64,
    pub personal_count: i64,
    pub last_read_at: Timestamp,
}

/// Quoted context shown above a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplySummary {
    pub id: MessageId,
    pub author_display_name: String,
    pub snippet: String,
}

impl ReplySummary {
    pub fn new(parent: &Message, author_display_name: String) -> Self {
        Self {
            id: parent.id,
            author_display_name,
            snippet: snippet(&parent.content),
        }
    }
}

/// Message enriched for one viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub message: Message,
    pub room_name: RoomName,
    pub author: Option<User>,
    pub reply: Option<ReplySummary>,
    pub reactions: ReactionCounts,
    pub my_reaction: Option<ReactionKind>,
}

/// A connected user as listed in presence events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineMember {
    pub user_id: UserId,
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

impl From<&User> for OnlineMember {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
        }
    }
}

/// Truncate to [`SNIPPET_CHARS`] characters, appending an ellipsis when cut.
pub fn snippet(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
