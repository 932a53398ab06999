//! UseCase: ルーム詳細取得（HTTP API 用）

use std::sync::Arc;

use crate::domain::{MessagePusher, Room, RoomKind, RoomRepository};

use super::error::ChatError;

/// A room with its live connection count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomDetail {
    pub room: Room,
    pub online_users: usize,
}

/// ルーム詳細取得のユースケース
///
/// 参照のみで、ルームを作成することはありません。
pub struct GetRoomDetailUseCase {
    rooms: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl GetRoomDetailUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>, message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            rooms,
            message_pusher,
        }
    }

    /// `None` for unknown or invalid room names
    pub async fn execute(&self, room_name: &str) -> Result<Option<RoomDetail>, ChatError> {
        let Ok((name, _)) = RoomKind::canonical(room_name.to_string()) else {
            return Ok(None);
        };
        let Some(room) = self.rooms.find_by_name(&name).await? else {
            return Ok(None);
        };
        let online_users = self.message_pusher.online_members(room.id).await.len();
        Ok(Some(RoomDetail { room, online_users }))
    }
}
