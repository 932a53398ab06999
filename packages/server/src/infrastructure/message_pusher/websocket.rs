//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - ルームごとのブロードキャストグループ（接続の集合）を管理
//! - イベントを JSON にエンコードし、各接続の `UnboundedSender` へ送信
//!
//! ## 設計ノート
//!
//! グループはプロセス全体で1つの `DashMap<RoomId, _>` に遅延生成されます。
//! 最後のメンバーが抜けるとグループ自体も削除されます。
//! 送信は unbounded チャンネルへの書き込みのみで、送信者が下流の配信を待つことはありません。

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::{
    domain::{
        ChatEvent, ConnectionId, MessagePushError, MessagePusher, OnlineMember, PusherChannel,
        RoomId,
    },
    infrastructure::dto::websocket::ServerMessage,
};

struct GroupMember {
    member: OnlineMember,
    sender: PusherChannel,
}

/// WebSocket を使った MessagePusher 実装
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// Room ID → (Connection ID → member)
    groups: DashMap<RoomId, HashMap<ConnectionId, GroupMember>>,
    /// Connection ID → sender, for private replies
    connections: DashMap<ConnectionId, PusherChannel>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live connections in a room
    #[cfg(test)]
    pub fn group_size(&self, room_id: RoomId) -> usize {
        self.groups.get(&room_id).map(|g| g.len()).unwrap_or(0)
    }

    fn encode(event: &ChatEvent) -> Result<String, MessagePushError> {
        serde_json::to_string(&ServerMessage::from(event))
            .map_err(|e| MessagePushError::Encode(e.to_string()))
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn join(
        &self,
        room_id: RoomId,
        connection_id: ConnectionId,
        member: OnlineMember,
        sender: PusherChannel,
    ) {
        self.connections.insert(connection_id, sender.clone());
        self.groups
            .entry(room_id)
            .or_default()
            .insert(connection_id, GroupMember { member, sender });
        tracing::debug!("Connection '{}' joined room {}", connection_id, room_id);
    }

    async fn leave(&self, room_id: RoomId, connection_id: ConnectionId) {
        if let Some(mut group) = self.groups.get_mut(&room_id) {
            group.remove(&connection_id);
        }
        self.groups.remove_if(&room_id, |_, group| group.is_empty());
        self.connections.remove(&connection_id);
        tracing::debug!("Connection '{}' left room {}", connection_id, room_id);
    }

    async fn push_to(
        &self,
        connection_id: ConnectionId,
        event: &ChatEvent,
    ) -> Result<(), MessagePushError> {
        let payload = Self::encode(event)?;
        let sender = self
            .connections
            .get(&connection_id)
            .ok_or_else(|| MessagePushError::ConnectionNotFound(connection_id.to_string()))?;
        sender
            .send(payload)
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::debug!("Pushed '{}' to connection '{}'", event.kind(), connection_id);
        Ok(())
    }

    async fn publish(
        &self,
        room_id: RoomId,
        event: &ChatEvent,
        exclude: Option<ConnectionId>,
    ) -> Result<usize, MessagePushError> {
        let payload = Self::encode(event)?;

        // Exclusive entry access: every member sees this room's events in one order.
        let Some(group) = self.groups.get_mut(&room_id) else {
            return Ok(0);
        };
        let mut delivered = 0;
        for (connection_id, target) in group.iter() {
            if Some(*connection_id) == exclude {
                continue;
            }
            // ブロードキャストでは一部の送信失敗を許容
            if let Err(e) = target.sender.send(payload.clone()) {
                tracing::warn!(
                    "Failed to push '{}' to connection '{}': {}",
                    event.kind(),
                    connection_id,
                    e
                );
            } else {
                delivered += 1;
            }
        }
        tracing::debug!(
            "Broadcasted '{}' to {} connection(s) in room {}",
            event.kind(),
            delivered,
            room_id
        );
        Ok(delivered)
    }

    async fn online_members(&self, room_id: RoomId) -> Vec<OnlineMember> {
        let Some(group) = self.groups.get(&room_id) else {
            return Vec::new();
        };
        let mut members: Vec<OnlineMember> = Vec::with_capacity(group.len());
        for target in group.values() {
            if !members.iter().any(|m| m.user_id == target.member.user_id) {
                members.push(target.member.clone());
            }
        }
        drop(group);
        members.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then(a.user_id.cmp(&b.user_id))
        });
        members
    }
}
