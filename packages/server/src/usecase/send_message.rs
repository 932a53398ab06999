//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 本文の検証、返信リンクの解決、ルームへのブロードキャスト、通知センターへのシグナル
//!
//! ### なぜこのテストが必要か
//! - 返信リンクは「同じルームの、より前に作成されたメッセージ」のみ許可され、
//!   それ以外は黙って破棄される（寛容な挙動を明示的に検証）
//! - 既読位置（カーソル）を動かさないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：送信とブロードキャスト、返信
//! - 異常系：空の本文
//! - エッジケース：別ルーム・存在しない返信先、ミュート中のスコープルーム

use std::sync::Arc;

use kaiwa_shared::time::Clock;

use crate::domain::{
    ChatEvent, Message, MessageContent, MessageId, MessagePusher, MessageRepository, NewMessage,
    NotificationSink, Room, RoomRepository, Timestamp, User,
};

use super::{error::ChatError, message_view::MessageViewBuilder};

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    rooms: Arc<dyn RoomRepository>,
    /// Repository（データアクセス層の抽象化）
    messages: Arc<dyn MessageRepository>,
    views: Arc<MessageViewBuilder>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    /// 通知センター（スコープルームのみ）
    notifications: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        messages: Arc<dyn MessageRepository>,
        views: Arc<MessageViewBuilder>,
        message_pusher: Arc<dyn MessagePusher>,
        notifications: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms,
            messages,
            views,
            message_pusher,
            notifications,
            clock,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `room` - 送信先ルーム
    /// * `author` - 送信者
    /// * `body` - 本文（前後の空白は除去される）
    /// * `reply_to` - 返信先メッセージ ID。無効な場合は破棄される
    ///
    /// # Returns
    ///
    /// * `Ok(Message)` - 保存されたメッセージ
    /// * `Err(ChatError)` - 本文が空・長すぎる、またはストア障害
    pub async fn execute(
        &self,
        room: &Room,
        author: &User,
        body: String,
        reply_to: Option<MessageId>,
    ) -> Result<Message, ChatError> {
        let content = MessageContent::new(body)?;
        let now = Timestamp::new(self.clock.now_millis());

        // 1. 返信リンクの解決（無効なら破棄）
        let parent_id = match reply_to {
            Some(parent_id) => self.resolve_parent(room, parent_id, now).await?,
            None => None,
        };

        // 2. 保存
        let message = self
            .messages
            .insert(NewMessage {
                room_id: room.id,
                author_id: author.id,
                content,
                parent_id,
                forwarded_from: None,
                created_at: now,
            })
            .await?;

        // 3. ルーム全体へブロードキャスト（送信者を含む）
        let view = self.views.build(message.clone(), &room.name, None).await?;
        if let Err(e) = self
            .message_pusher
            .publish(room.id, &ChatEvent::NewMessage(view), None)
            .await
        {
            tracing::warn!("Failed to broadcast message {}: {}", message.id, e);
        }

        // 4. スコープルームでは通知センターへシグナル（待たない）
        //    ミュートは接続後に切り替わりうるため最新の状態を読む
        if room.kind.is_scoped() && !self.is_muted(room).await {
            let sink = Arc::clone(&self.notifications);
            let room = room.clone();
            let author = author.clone();
            let signalled = message.clone();
            tokio::spawn(async move {
                if let Err(e) = sink.notify_new_message(&room, &signalled, &author).await {
                    tracing::warn!("Notification for message {} dropped: {}", signalled.id, e);
                }
            });
        }

        Ok(message)
    }

    async fn is_muted(&self, room: &Room) -> bool {
        match self.rooms.find_by_id(room.id).await {
            Ok(Some(current)) => current.is_muted,
            Ok(None) => room.is_muted,
            Err(e) => {
                tracing::warn!("Could not read mute flag of '{}': {}", room.name, e);
                room.is_muted
            }
        }
    }

    /// 同じルームの、より前に作成されたメッセージのみ返信先として認める
    async fn resolve_parent(
        &self,
        room: &Room,
        parent_id: MessageId,
        now: Timestamp,
    ) -> Result<Option<MessageId>, ChatError> {
        match self.messages.find(parent_id).await? {
            Some(parent) if parent.room_id == room.id && parent.created_at < now => {
                Ok(Some(parent.id))
            }
            Some(_) => {
                tracing::warn!(
                    "Reply target {} is not an earlier message of '{}'; link dropped",
                    parent_id,
                    room.name
                );
                Ok(None)
            }
            None => {
                tracing::warn!("Reply target {} does not exist; link dropped", parent_id);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        domain::{MockNotificationSink, NotificationError, PositionRepository, Role},
        usecase::{
            MuteRoomUseCase,
            test_support::{Fixture, drain, drain_types},
        },
    };

    fn create_usecase(fx: &Fixture, sink: MockNotificationSink) -> SendMessageUseCase {
        SendMessageUseCase::new(
            fx.store.clone(),
            fx.store.clone(),
            fx.views.clone(),
            fx.pusher.clone(),
            Arc::new(sink),
            fx.clock.clone(),
        )
    }

    fn silent_sink() -> MockNotificationSink {
        let mut sink = MockNotificationSink::new();
        sink.expect_notify_new_message().times(0);
        sink
    }

    #[tokio::test]
    async fn test_send_broadcasts_to_whole_room() {
        // テスト項目: 送信したメッセージが送信者を含むルーム全員に配信される
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let bob = fx.user("bob", Role::User).await;
        let general = fx.room("general").await;
        let (_, mut alice_rx) = fx.join(&general, &alice).await;
        let (_, mut bob_rx) = fx.join(&general, &bob).await;
        let usecase = create_usecase(&fx, silent_sink());

        // when (操作):
        let message = usecase
            .execute(&general, &alice, "  hello  ".to_string(), None)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(message.content, "hello");
        for rx in [&mut alice_rx, &mut bob_rx] {
            let frames = drain(rx);
            assert_eq!(frames.len(), 1);
            assert_eq!(frames[0]["type"], "new_message");
            assert_eq!(frames[0]["message"]["content"], "hello");
            assert_eq!(frames[0]["message"]["author"]["display_name"], "Alice");
        }
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected_without_broadcast() {
        // テスト項目: 空白のみの本文は ValidationError になり、配信されない
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let general = fx.room("general").await;
        let (_, mut rx) = fx.join(&general, &alice).await;
        let usecase = create_usecase(&fx, silent_sink());

        // when (操作):
        let result = usecase.execute(&general, &alice, "   ".to_string(), None).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ChatError::Validation(_))));
        assert!(drain_types(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_reply_carries_parent_summary() {
        // テスト項目: 返信には返信元の要約が付く
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let bob = fx.user("bob", Role::User).await;
        let general = fx.room("general").await;
        let parent = fx.post(&general, &alice, "original question").await;
        let (_, mut rx) = fx.join(&general, &bob).await;
        let usecase = create_usecase(&fx, silent_sink());

        // when (操作):
        let reply = usecase
            .execute(&general, &bob, "answer".to_string(), Some(parent.id))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(reply.parent_id, Some(parent.id));
        let frames = drain(&mut rx);
        assert_eq!(frames[0]["message"]["reply_to"]["id"], parent.id.value());
        assert_eq!(frames[0]["message"]["reply_to"]["author_display_name"], "Alice");
        assert_eq!(frames[0]["message"]["reply_to"]["snippet"], "original question");
    }

    #[tokio::test]
    async fn test_invalid_reply_target_is_silently_dropped() {
        // テスト項目: 別ルーム・存在しない返信先は黙って破棄され、送信自体は成功する
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let general = fx.room("general").await;
        let other = fx.room("random").await;
        let elsewhere = fx.post(&other, &alice, "in another room").await;
        let usecase = create_usecase(&fx, silent_sink());

        // when (操作):
        let cross_room = usecase
            .execute(&general, &alice, "a".to_string(), Some(elsewhere.id))
            .await
            .unwrap();
        let missing = usecase
            .execute(&general, &alice, "b".to_string(), Some(MessageId::new(9_999)))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(cross_room.parent_id, None);
        assert_eq!(missing.parent_id, None);
    }

    #[tokio::test]
    async fn test_send_does_not_move_read_cursors() {
        // テスト項目: 送信は送信者を含む誰の既読位置も動かさない
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let general = fx.room("general").await;
        let before = fx
            .store
            .get_or_init(alice.id, general.id, fx.now())
            .await
            .unwrap();
        let usecase = create_usecase(&fx, silent_sink());

        // when (操作):
        usecase
            .execute(&general, &alice, "hi".to_string(), None)
            .await
            .unwrap();

        // then (期待する結果):
        let after = fx
            .store
            .get_or_init(alice.id, general.id, fx.now())
            .await
            .unwrap();
        assert_eq!(before.last_read_at, after.last_read_at);
    }

    #[tokio::test]
    async fn test_scoped_room_signals_notification_sink() {
        // テスト項目: スコープルームへの送信で通知センターに1回シグナルされる
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let thread = fx.room("book-club").await;
        let (tx, rx) = tokio::sync::oneshot::channel();
        let tx = std::sync::Mutex::new(Some(tx));
        let mut sink = MockNotificationSink::new();
        sink.expect_notify_new_message()
            .times(1)
            .returning(move |room, _, author| {
                assert_eq!(room.name.as_str(), "book-club");
                assert_eq!(author.username, "alice");
                if let Some(tx) = tx.lock().unwrap().take() {
                    let _ = tx.send(());
                }
                Ok(())
            });
        let usecase = create_usecase(&fx, sink);

        // when (操作):
        usecase
            .execute(&thread, &alice, "hi".to_string(), None)
            .await
            .unwrap();

        // then (期待する結果):
        tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_fail_send() {
        // テスト項目: 通知センターの失敗は握りつぶされ、送信は成功する
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let thread = fx.room("book-club").await;
        let mut sink = MockNotificationSink::new();
        sink.expect_notify_new_message()
            .returning(|_, _, _| Err(NotificationError::Unavailable("offline".to_string())));
        let usecase = create_usecase(&fx, sink);

        // when (操作):
        let result = usecase.execute(&thread, &alice, "hi".to_string(), None).await;

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_open_and_muted_rooms_skip_notification_sink() {
        // テスト項目: オープンルームと、接続後にミュートされたルームでは通知しない
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let general = fx.room("general").await;
        let muted = fx.room("quiet-corner").await;
        let moderator = fx.user("mia", Role::Moderator).await;
        MuteRoomUseCase::new(fx.store.clone(), fx.pusher.clone(), fx.clock.clone())
            .execute(&muted, &moderator, true)
            .await
            .unwrap();
        let usecase = create_usecase(&fx, silent_sink());

        // when (操作):
        usecase
            .execute(&general, &alice, "a".to_string(), None)
            .await
            .unwrap();
        usecase
            .execute(&muted, &alice, "b".to_string(), None)
            .await
            .unwrap();

        // then (期待する結果):
        tokio::task::yield_now().await;
    }
}
