//! MessagePusher trait 定義
//!
//! ライブ接続へのイベント配信のインターフェース。永続化とは独立しています。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    entity::OnlineMember,
    error::MessagePushError,
    event::ChatEvent,
    value_object::{ConnectionId, RoomId},
};

/// Outbound channel of one connection; carries encoded frames
pub type PusherChannel = mpsc::UnboundedSender<String>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// Add a connection to the room's broadcast group
    async fn join(
        &self,
        room_id: RoomId,
        connection_id: ConnectionId,
        member: OnlineMember,
        sender: PusherChannel,
    );

    /// Remove a connection from the room's broadcast group
    async fn leave(&self, room_id: RoomId, connection_id: ConnectionId);

    /// Deliver an event to a single connection
    async fn push_to(
        &self,
        connection_id: ConnectionId,
        event: &ChatEvent,
    ) -> Result<(), MessagePushError>;

    /// Fan out an event to every member of the room except `exclude`;
    /// returns the number of connections reached
    async fn publish(
        &self,
        room_id: RoomId,
        event: &ChatEvent,
        exclude: Option<ConnectionId>,
    ) -> Result<usize, MessagePushError>;

    /// Connected users of a room, one entry per user
    async fn online_members(&self, room_id: RoomId) -> Vec<OnlineMember>;
}
