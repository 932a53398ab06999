//! UseCase: ルーム履歴の消去（owner のみ）

use std::sync::Arc;

use kaiwa_shared::time::Clock;

use crate::domain::{
    ChatEvent, MessagePusher, Room, RoomRepository, Timestamp, User,
    policy::{Operation, Target, authorize},
};

use super::error::ChatError;

pub struct ClearHistoryUseCase {
    rooms: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ClearHistoryUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms,
            message_pusher,
            clock,
        }
    }

    /// Physically remove the room's messages and broadcast `history_cleared`
    ///
    /// Returns the number of removed messages.
    pub async fn execute(&self, room: &Room, actor: &User) -> Result<u64, ChatError> {
        if !authorize(Operation::ClearHistory, actor.role, Target::Room).is_allowed() {
            return Err(ChatError::PermissionDenied);
        }

        let now = Timestamp::new(self.clock.now_millis());
        let removed = self.rooms.clear_history(room.id, now).await?;
        tracing::info!(
            "History of '{}' cleared by '{}' ({} message(s))",
            room.name,
            actor.username,
            removed
        );

        let event = ChatEvent::HistoryCleared {
            cleared_by: actor.id,
        };
        if let Err(e) = self.message_pusher.publish(room.id, &event, None).await {
            tracing::warn!("Failed to broadcast history_cleared: {}", e);
        }
        Ok(removed)
    }
}
