//! UseCase: メッセージ削除処理（ソフトデリート）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DeleteMessageUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 削除は本文を墓標（tombstone）に置き換えるだけで、返信チェーンは保たれる
//! - ロールによる権限表（owner / admin・moderator / 一般）がそのまま適用される
//!
//! ### どのような状況を想定しているか
//! - 正常系：owner による他人のメッセージ削除
//! - 異常系：一般ユーザーによる他人のメッセージ削除、二重削除

use std::sync::Arc;

use crate::domain::{
    ChatEvent, Message, MessageId, MessagePusher, MessageRepository, Room, TOMBSTONE, User,
    UserDirectory,
    policy::{Operation, authorize, message_target},
};

use super::{error::ChatError, message_view::MessageViewBuilder};

/// メッセージ削除のユースケース
pub struct DeleteMessageUseCase {
    messages: Arc<dyn MessageRepository>,
    users: Arc<dyn UserDirectory>,
    views: Arc<MessageViewBuilder>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl DeleteMessageUseCase {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        users: Arc<dyn UserDirectory>,
        views: Arc<MessageViewBuilder>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            messages,
            users,
            views,
            message_pusher,
        }
    }

    /// メッセージ削除を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Message)` - 墓標に置き換えられたメッセージ
    /// * `Err(ChatError)` - NotFound / PermissionDenied / ストア障害
    pub async fn execute(
        &self,
        room: &Room,
        actor: &User,
        message_id: MessageId,
    ) -> Result<Message, ChatError> {
        let message = self.views.find_live(message_id, room.id).await?;
        let author = self.users.find(message.author_id).await?;
        let target = message_target(actor, &message, author.as_ref());
        if !authorize(Operation::Delete, actor.role, target).is_allowed() {
            tracing::info!(
                "User '{}' may not delete message {}",
                actor.username,
                message_id
            );
            return Err(ChatError::PermissionDenied);
        }

        let deleted = self
            .messages
            .soft_delete(message_id, TOMBSTONE)
            .await?
            .ok_or_else(|| ChatError::NotFound("Message not found".to_string()))?;
        tracing::info!("Message {} deleted by '{}'", message_id, actor.username);

        let event = ChatEvent::MessageDeleted {
            message_id,
            content: deleted.content.clone(),
            deleted_by: actor.id,
        };
        if let Err(e) = self.message_pusher.publish(room.id, &event, None).await {
            tracing::warn!("Failed to broadcast deletion of {}: {}", message_id, e);
        }
        Ok(deleted)
    }
}
