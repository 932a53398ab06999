//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 切断時に残りの参加者へ user_left が届き、グループから登録解除されることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者の切断と通知
//! - エッジケース：最後の参加者の切断（グループ自体が削除される）

use std::sync::Arc;

use crate::domain::{ChatEvent, ConnectionId, MessagePusher, OnlineMember, Room, User};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// 参加者切断を実行
    ///
    /// # Returns
    ///
    /// user_left が届いた接続数
    pub async fn execute(&self, room: &Room, user: &User, connection_id: ConnectionId) -> usize {
        // 1. グループから登録解除
        self.message_pusher.leave(room.id, connection_id).await;

        // 2. 残りの参加者へ user_left
        let event = ChatEvent::UserLeft(OnlineMember::from(user));
        let notified = match self.message_pusher.publish(room.id, &event, None).await {
            Ok(notified) => notified,
            Err(e) => {
                tracing::warn!("Failed to broadcast user_left: {}", e);
                0
            }
        };

        tracing::info!(
            "User '{}' left '{}' ({})",
            user.username,
            room.name,
            connection_id
        );
        notified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::Role,
        usecase::test_support::{Fixture, drain},
    };

    #[tokio::test]
    async fn test_disconnect_notifies_remaining_members() {
        // テスト項目: 切断すると残りの参加者に user_left が届く
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let bob = fx.user("bob", Role::User).await;
        let general = fx.room("general").await;
        let (alice_conn, mut alice_rx) = fx.join(&general, &alice).await;
        let (_, mut bob_rx) = fx.join(&general, &bob).await;
        let usecase = DisconnectParticipantUseCase::new(fx.pusher.clone());

        // when (操作):
        let notified = usecase.execute(&general, &alice, alice_conn).await;

        // then (期待する結果):
        assert_eq!(notified, 1);
        let frames = drain(&mut bob_rx);
        assert_eq!(frames[0]["type"], "user_left");
        assert_eq!(frames[0]["user"]["username"], "alice");
        assert!(drain(&mut alice_rx).is_empty());
        assert_eq!(fx.pusher.group_size(general.id), 1);
    }

    #[tokio::test]
    async fn test_last_member_leaving_empties_group() {
        // テスト項目: 最後の参加者が切断するとグループが空になる
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let general = fx.room("general").await;
        let (conn, _rx) = fx.join(&general, &alice).await;
        let usecase = DisconnectParticipantUseCase::new(fx.pusher.clone());

        // when (操作):
        let notified = usecase.execute(&general, &alice, conn).await;

        // then (期待する結果):
        assert_eq!(notified, 0);
        assert_eq!(fx.pusher.group_size(general.id), 0);
    }
}
