//! UseCase: オンライン一覧と入力中表示
//!
//! どちらもブロードキャストグループのみを参照し、永続化はしません。

use std::sync::Arc;

use crate::domain::{
    ChatEvent, ConnectionId, MessagePushError, MessagePusher, OnlineMember, Room, User,
};

pub struct PresenceUseCase {
    message_pusher: Arc<dyn MessagePusher>,
}

impl PresenceUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// Reply privately with the room's connected users
    pub async fn online_users(
        &self,
        room: &Room,
        connection_id: ConnectionId,
    ) -> Result<Vec<OnlineMember>, MessagePushError> {
        let members = self.message_pusher.online_members(room.id).await;
        self.message_pusher
            .push_to(connection_id, &ChatEvent::OnlineUsers(members.clone()))
            .await?;
        Ok(members)
    }

    /// Relay a typing indicator to everyone but the typist
    pub async fn typing(
        &self,
        room: &Room,
        user: &User,
        connection_id: ConnectionId,
        is_typing: bool,
    ) -> Result<usize, MessagePushError> {
        let event = ChatEvent::Typing {
            member: OnlineMember::from(user),
            is_typing,
        };
        self.message_pusher
            .publish(room.id, &event, Some(connection_id))
            .await
    }
}
