//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::authorize() / execute() メソッド
//! - 認証・ルームのアクセス判定と、接続直後のイベント順序
//!
//! ### なぜこのテストが必要か
//! - 未認証の接続はルームに参加させない
//! - 「既読位置の初期化 → unread_info の送信 → user_joined のブロードキャスト」の順序を保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：初回接続で unread_info が 0
//! - 異常系：トークンなし・不正なトークン、不正なルーム名、権限のないルーム
//! - エッジケース：user_joined は本人には送られない

use std::sync::Arc;

use kaiwa_shared::time::Clock;

use crate::domain::{
    ChatEvent, ConnectionId, MessagePusher, OnlineMember, PusherChannel, Room, RoomKind,
    RoomRepository, Timestamp, UnreadSnapshot, User, UserDirectory,
};

use super::{
    error::{ChatError, ConnectError},
    read_position::ReadPositionUseCase,
};

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    users: Arc<dyn UserDirectory>,
    rooms: Arc<dyn RoomRepository>,
    read_positions: Arc<ReadPositionUseCase>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(
        users: Arc<dyn UserDirectory>,
        rooms: Arc<dyn RoomRepository>,
        read_positions: Arc<ReadPositionUseCase>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            rooms,
            read_positions,
            message_pusher,
            clock,
        }
    }

    /// 接続前の認証とルーム解決
    ///
    /// ルームは参照時に作成されますが、アクセスできないユーザーが作成することはありません。
    ///
    /// # Returns
    ///
    /// * `Ok((User, Room))` - 認証済みユーザーと参加先ルーム
    /// * `Err(ConnectError)` - 未認証、不正なルーム名、アクセス拒否、ストア障害
    pub async fn authorize(
        &self,
        token: Option<&str>,
        room_name: &str,
    ) -> Result<(User, Room), ConnectError> {
        let token = token.ok_or(ConnectError::Unauthenticated)?;
        let user = self
            .users
            .authenticate(token)
            .await?
            .ok_or(ConnectError::Unauthenticated)?;

        let (name, kind) = RoomKind::canonical(room_name.to_string())
            .map_err(|e| ConnectError::InvalidRoom(e.to_string()))?;
        if !user.may_enter(kind) {
            tracing::info!("User '{}' denied access to '{}'", user.username, name);
            return Err(ConnectError::AccessDenied);
        }

        let now = Timestamp::new(self.clock.now_millis());
        let room = self.rooms.resolve_or_create(&name, kind, now).await?;
        Ok((user, room))
    }

    /// 参加者接続を実行
    ///
    /// グループへの登録、既読位置の初期化と unread_info の送信（この順序で1単位）、
    /// その後で他の参加者へ user_joined をブロードキャストします。
    pub async fn execute(
        &self,
        room: &Room,
        user: &User,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) -> Result<UnreadSnapshot, ChatError> {
        let member = OnlineMember::from(user);

        // 1. ブロードキャストグループに登録
        self.message_pusher
            .join(room.id, connection_id, member.clone(), sender)
            .await;

        // 2. 既読位置の初期化 → unread_info（本人のみ）
        let snapshot = self.read_positions.snapshot(user, room).await;
        if let Ok(snapshot) = &snapshot {
            if let Err(e) = self
                .message_pusher
                .push_to(connection_id, &ChatEvent::UnreadInfo(*snapshot))
                .await
            {
                tracing::warn!("Failed to send unread_info to {}: {}", connection_id, e);
            }
        }

        // 3. 他の参加者へ user_joined
        if let Err(e) = self
            .message_pusher
            .publish(room.id, &ChatEvent::UserJoined(member), Some(connection_id))
            .await
        {
            tracing::warn!("Failed to broadcast user_joined: {}", e);
        }

        tracing::info!(
            "User '{}' joined '{}' ({})",
            user.username,
            room.name,
            connection_id
        );
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Role, RoomName},
        usecase::test_support::{Fixture, drain, drain_types},
    };

    fn create_usecase(fx: &Fixture) -> ConnectParticipantUseCase {
        let read_positions = Arc::new(ReadPositionUseCase::new(
            fx.store.clone(),
            fx.store.clone(),
            fx.clock.clone(),
            Vec::new(),
        ));
        ConnectParticipantUseCase::new(
            fx.store.clone(),
            fx.store.clone(),
            read_positions,
            fx.pusher.clone(),
            fx.clock.clone(),
        )
    }

    #[tokio::test]
    async fn test_authorize_rejects_missing_and_unknown_tokens() {
        // テスト項目: トークンなし・不正なトークンは Unauthenticated
        // given (前提条件):
        let fx = Fixture::new().await;
        fx.user("alice", Role::User).await;
        let usecase = create_usecase(&fx);

        // when (操作):
        let missing = usecase.authorize(None, "general").await;
        let unknown = usecase.authorize(Some("forged"), "general").await;
        let valid = usecase.authorize(Some("alice-token"), "general").await;

        // then (期待する結果):
        assert_eq!(missing.unwrap_err(), ConnectError::Unauthenticated);
        assert_eq!(unknown.unwrap_err(), ConnectError::Unauthenticated);
        let (user, room) = valid.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(room.name.as_str(), "general");
    }

    #[tokio::test]
    async fn test_authorize_checks_room_name_and_access() {
        // テスト項目: 不正なルーム名は InvalidRoom、権限のないルームは AccessDenied で作成もされない
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let bob = fx.user("bob", Role::User).await;
        fx.user("carol", Role::User).await;
        let usecase = create_usecase(&fx);
        let thread = format!("dm:{}:{}", bob.id, alice.id);

        // when / then (操作と期待する結果):
        assert!(matches!(
            usecase.authorize(Some("alice-token"), "no spaces").await,
            Err(ConnectError::InvalidRoom(_))
        ));
        assert!(matches!(
            usecase.authorize(Some("alice-token"), "dm:1:1").await,
            Err(ConnectError::InvalidRoom(_))
        ));
        assert_eq!(
            usecase
                .authorize(Some("alice-token"), "moderators")
                .await
                .unwrap_err(),
            ConnectError::AccessDenied
        );
        assert_eq!(
            usecase
                .authorize(Some("carol-token"), &thread)
                .await
                .unwrap_err(),
            ConnectError::AccessDenied
        );
        let (_, room) = usecase
            .authorize(Some("alice-token"), &thread)
            .await
            .unwrap();
        assert_eq!(
            room.kind,
            RoomKind::Direct {
                first: alice.id,
                second: bob.id
            }
        );
        let moderators = RoomName::new("moderators".to_string()).unwrap();
        assert!(fx.store.find_by_name(&moderators).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_first_connect_reports_zero_then_announces() {
        // テスト項目: 初回接続では履歴があっても unread_info は 0 で、その後 user_joined が他の参加者に届く
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::Vip).await;
        let bob = fx.user("bob", Role::Vip).await;
        let vip = fx.room("vip").await;
        for text in ["one", "two", "three"] {
            fx.post(&vip, &alice, text).await;
        }
        let (_, mut alice_rx) = fx.join(&vip, &alice).await;
        let usecase = create_usecase(&fx);
        let (tx, mut bob_rx) = tokio::sync::mpsc::unbounded_channel();
        let connection_id = ConnectionId::generate();

        // when (操作):
        let snapshot = usecase
            .execute(&vip, &bob, connection_id, tx)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(snapshot.unread_count, 0);
        let own = drain(&mut bob_rx);
        assert_eq!(own.len(), 1);
        assert_eq!(own[0]["type"], "unread_info");
        assert_eq!(own[0]["unread_count"], 0);
        assert_eq!(drain_types(&mut alice_rx), vec!["user_joined"]);
        assert_eq!(fx.pusher.group_size(vip.id), 2);
    }

    #[tokio::test]
    async fn test_direct_thread_resolves_to_one_room_in_either_order() {
        // テスト項目: dm:<a>:<b> と dm:<b>:<a> は同じ1対1スレッドに解決される
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let bob = fx.user("bob", Role::User).await;
        let usecase = create_usecase(&fx);
        let forward = format!("dm:{}:{}", alice.id, bob.id);
        let reversed = format!("dm:{}:{}", bob.id, alice.id);

        // when (操作):
        let (_, from_alice) = usecase
            .authorize(Some("alice-token"), &forward)
            .await
            .unwrap();
        let (_, from_bob) = usecase
            .authorize(Some("bob-token"), &reversed)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(from_alice.id, from_bob.id);
        assert_eq!(from_bob.name.as_str(), forward);
        let reversed_name = RoomName::new(reversed).unwrap();
        assert!(fx.store.find_by_name(&reversed_name).await.unwrap().is_none());
    }
}
