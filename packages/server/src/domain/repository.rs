//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! All writes rely on the store's own atomicity: get-or-create goes through
//! a uniqueness constraint, mutations are conditional updates.

use async_trait::async_trait;

use super::{
    entity::{
        Message, NewMessage, Reaction, ReactionCounts, Room, UnreadCandidate, User,
        UserChatPosition,
    },
    error::RepositoryError,
    value_object::{MessageId, ReactionKind, RoomId, RoomKind, RoomName, Timestamp, UserId},
};

/// Room Repository trait
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Idempotent get-or-create keyed by the unique room name
    async fn resolve_or_create(
        &self,
        name: &RoomName,
        kind: RoomKind,
        now: Timestamp,
    ) -> Result<Room, RepositoryError>;

    async fn find_by_name(&self, name: &RoomName) -> Result<Option<Room>, RepositoryError>;

    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError>;

    /// Remove the room's messages and reactions and flag the room; returns removed message count
    async fn clear_history(&self, id: RoomId, now: Timestamp) -> Result<u64, RepositoryError>;

    async fn set_muted(&self, id: RoomId, muted: bool, now: Timestamp)
    -> Result<(), RepositoryError>;
}

/// Message Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert(&self, message: NewMessage) -> Result<Message, RepositoryError>;

    /// Look up a message regardless of its soft-delete state
    async fn find(&self, id: MessageId) -> Result<Option<Message>, RepositoryError>;

    /// Set new content and edit stamp; `None` when the message is missing or deleted
    async fn update_content(
        &self,
        id: MessageId,
        content: &str,
        editor: UserId,
        at: Timestamp,
    ) -> Result<Option<Message>, RepositoryError>;

    /// Replace the body with `tombstone` and set the delete flag; `None` when missing or already deleted
    async fn soft_delete(
        &self,
        id: MessageId,
        tombstone: &str,
    ) -> Result<Option<Message>, RepositoryError>;

    /// Pin (`Some`) or unpin (`None`); `None` result when missing or deleted
    async fn set_pinned(
        &self,
        id: MessageId,
        pin: Option<(UserId, Timestamp)>,
    ) -> Result<Option<Message>, RepositoryError>;

    /// Non-deleted messages of a room, newest first
    async fn list_recent(
        &self,
        room_id: RoomId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, RepositoryError>;

    /// Non-deleted messages older than `before`, newest first
    async fn list_before(
        &self,
        room_id: RoomId,
        before: MessageId,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError>;

    /// Messages after `since`, not authored by `viewer`, not deleted
    async fn count_unread(
        &self,
        room_id: RoomId,
        viewer: UserId,
        since: Timestamp,
    ) -> Result<i64, RepositoryError>;

    /// Same filter as [`MessageRepository::count_unread`], with parent authorship
    async fn list_unread(
        &self,
        room_id: RoomId,
        viewer: UserId,
        since: Timestamp,
    ) -> Result<Vec<UnreadCandidate>, RepositoryError>;
}

/// Reaction Repository trait
#[async_trait]
pub trait ReactionRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the (message, user) pair already reacted
    async fn insert(&self, reaction: &Reaction) -> Result<(), RepositoryError>;

    async fn counts(&self, message_id: MessageId) -> Result<ReactionCounts, RepositoryError>;

    async fn find_for_user(
        &self,
        message_id: MessageId,
        user_id: UserId,
    ) -> Result<Option<ReactionKind>, RepositoryError>;
}

/// Read position Repository trait
#[async_trait]
pub trait PositionRepository: Send + Sync {
    /// Returns the existing cursor, or creates one at `now`
    async fn get_or_init(
        &self,
        user_id: UserId,
        room_id: RoomId,
        now: Timestamp,
    ) -> Result<UserChatPosition, RepositoryError>;

    async fn move_cursor(
        &self,
        user_id: UserId,
        room_id: RoomId,
        last_read_at: Timestamp,
        last_read_message_id: Option<MessageId>,
        now: Timestamp,
    ) -> Result<UserChatPosition, RepositoryError>;

    async fn store_counters(
        &self,
        user_id: UserId,
        room_id: RoomId,
        unread: i64,
        personal: i64,
        now: Timestamp,
    ) -> Result<(), RepositoryError>;
}

/// Identity and role provider
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<Option<User>, RepositoryError>;

    async fn find(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
}
