//! UseCase: メッセージ転送処理（カスケード転送）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ForwardMessageUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 転送を何度繰り返しても「転送元」ブロックは1つだけであることを保証
//! - 転送イベントは転送「先」ルームにのみ配信される
//!
//! ### どのような状況を想定しているか
//! - 正常系：コメント付き転送、転送の再転送
//! - 異常系：アクセスできないルームへの転送、削除済みメッセージの転送

use std::sync::Arc;

use kaiwa_shared::time::Clock;

use crate::domain::{
    ChatEvent, Message, MessageContent, MessageId, MessagePusher, MessageRepository, NewMessage,
    Room, RoomKind, RoomRepository, Timestamp, User, forward::compose_forward_body,
};

use super::{error::ChatError, message_view::MessageViewBuilder};

/// メッセージ転送のユースケース
pub struct ForwardMessageUseCase {
    rooms: Arc<dyn RoomRepository>,
    messages: Arc<dyn MessageRepository>,
    views: Arc<MessageViewBuilder>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ForwardMessageUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        messages: Arc<dyn MessageRepository>,
        views: Arc<MessageViewBuilder>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms,
            messages,
            views,
            message_pusher,
            clock,
        }
    }

    /// メッセージ転送を実行
    ///
    /// # Arguments
    ///
    /// * `source_room` - 転送元メッセージのあるルーム
    /// * `actor` - 転送するユーザー（新しいメッセージの作成者）
    /// * `message_id` - 転送元メッセージ
    /// * `target_room` - 転送先ルーム名（初回参照時に作成される）
    /// * `custom_comment` - 任意のコメント
    pub async fn execute(
        &self,
        source_room: &Room,
        actor: &User,
        message_id: MessageId,
        target_room: String,
        custom_comment: Option<String>,
    ) -> Result<Message, ChatError> {
        let source = self.views.find_live(message_id, source_room.id).await?;

        let (target_name, target_kind) = RoomKind::canonical(target_room)?;
        if !actor.may_enter(target_kind) {
            return Err(ChatError::PermissionDenied);
        }

        let now = Timestamp::new(self.clock.now_millis());
        let target = self
            .rooms
            .resolve_or_create(&target_name, target_kind, now)
            .await?;

        let author_name = self.views.display_name_of(source.author_id).await?;
        let body = compose_forward_body(
            custom_comment.as_deref(),
            &source_room.display_name(),
            &author_name,
            &source,
        );
        let content = MessageContent::new(body)?;

        let forwarded = self
            .messages
            .insert(NewMessage {
                room_id: target.id,
                author_id: actor.id,
                content,
                parent_id: None,
                forwarded_from: Some(source.id),
                created_at: now,
            })
            .await?;
        tracing::info!(
            "Message {} forwarded from '{}' to '{}' as {}",
            source.id,
            source_room.name,
            target.name,
            forwarded.id
        );

        let view = self
            .views
            .build(forwarded.clone(), &target.name, None)
            .await?;
        if let Err(e) = self
            .message_pusher
            .publish(target.id, &ChatEvent::MessageForwarded(view), None)
            .await
        {
            tracing::warn!("Failed to broadcast forward {}: {}", forwarded.id, e);
        }
        Ok(forwarded)
    }
}
