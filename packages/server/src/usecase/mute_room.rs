//! UseCase: ルームのミュート切り替え（owner / admin / moderator）
//!
//! ミュート中のスコープルームでは通知センターへのシグナルを送らない。

use std::sync::Arc;

use kaiwa_shared::time::Clock;

use crate::domain::{
    ChatEvent, MessagePusher, Room, RoomRepository, Timestamp, User,
    policy::{Operation, Target, authorize},
};

use super::error::ChatError;

pub struct MuteRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl MuteRoomUseCase {
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

    /// Persist the mute flag and broadcast `room_muted`
    pub async fn execute(&self, room: &Room, actor: &User, muted: bool) -> Result<(), ChatError> {
        if !authorize(Operation::Mute, actor.role, Target::Room).is_allowed() {
            return Err(ChatError::PermissionDenied);
        }

        let now = Timestamp::new(self.clock.now_millis());
        self.rooms.set_muted(room.id, muted, now).await?;
        tracing::info!(
            "Room '{}' {} by '{}'",
            room.name,
            if muted { "muted" } else { "unmuted" },
            actor.username
        );

        let event = ChatEvent::RoomMuted {
            is_muted: muted,
            changed_by: actor.id,
        };
        if let Err(e) = self.message_pusher.publish(room.id, &event, None).await {
            tracing::warn!("Failed to broadcast room_muted: {}", e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::Role,
        usecase::test_support::{Fixture, drain, drain_types},
    };

    fn create_usecase(fx: &Fixture) -> MuteRoomUseCase {
        MuteRoomUseCase::new(fx.store.clone(), fx.pusher.clone(), fx.clock.clone())
    }

    #[tokio::test]
    async fn test_moderator_mutes_and_unmutes_room() {
        // テスト項目: moderator はルームをミュートでき、フラグが保存されて room_muted が配信される
        // given (前提条件):
        let fx = Fixture::new().await;
        let mod_user = fx.user("mia", Role::Moderator).await;
        let room = fx.room("book-club").await;
        let (_, mut rx) = fx.join(&room, &mod_user).await;
        let usecase = create_usecase(&fx);

        // when (操作):
        usecase.execute(&room, &mod_user, true).await.unwrap();

        // then (期待する結果):
        let stored = fx.store.find_by_id(room.id).await.unwrap().unwrap();
        assert!(stored.is_muted);
        let frames = drain(&mut rx);
        assert_eq!(frames[0]["type"], "room_muted");
        assert_eq!(frames[0]["is_muted"], true);
        assert_eq!(frames[0]["changed_by"], mod_user.id.value());

        usecase.execute(&room, &mod_user, false).await.unwrap();
        let stored = fx.store.find_by_id(room.id).await.unwrap().unwrap();
        assert!(!stored.is_muted);
    }

    #[tokio::test]
    async fn test_ordinary_user_cannot_mute() {
        // テスト項目: 一般ユーザーはミュートできず、何も配信されない
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let room = fx.room("book-club").await;
        let (_, mut rx) = fx.join(&room, &alice).await;

        // when (操作):
        let result = create_usecase(&fx).execute(&room, &alice, true).await;

        // then (期待する結果):
        assert_eq!(result, Err(ChatError::PermissionDenied));
        let stored = fx.store.find_by_id(room.id).await.unwrap().unwrap();
        assert!(!stored.is_muted);
        assert!(drain_types(&mut rx).is_empty());
    }
}
