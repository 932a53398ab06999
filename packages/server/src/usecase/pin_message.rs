//! UseCase: メッセージのピン留め・解除
//!
//! ピン留めはロールのみで判定し、メッセージの作成者は問いません。

use std::sync::Arc;

use kaiwa_shared::time::Clock;

use crate::domain::{
    ChatEvent, Message, MessageId, MessagePusher, MessageRepository, Room, Timestamp, User,
    policy::{Operation, Target, authorize},
};

use super::{error::ChatError, message_view::MessageViewBuilder};

/// ピン留め・解除のユースケース
pub struct PinMessageUseCase {
    messages: Arc<dyn MessageRepository>,
    views: Arc<MessageViewBuilder>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl PinMessageUseCase {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        views: Arc<MessageViewBuilder>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            messages,
            views,
            message_pusher,
            clock,
        }
    }

    /// `pinned == true` pins, `false` unpins
    pub async fn execute(
        &self,
        room: &Room,
        actor: &User,
        message_id: MessageId,
        pinned: bool,
    ) -> Result<Message, ChatError> {
        let operation = if pinned { Operation::Pin } else { Operation::Unpin };
        if !authorize(operation, actor.role, Target::Room).is_allowed() {
            return Err(ChatError::PermissionDenied);
        }
        self.views.find_live(message_id, room.id).await?;

        let now = Timestamp::new(self.clock.now_millis());
        let pin = pinned.then_some((actor.id, now));
        let updated = self
            .messages
            .set_pinned(message_id, pin)
            .await?
            .ok_or_else(|| ChatError::NotFound("Message not found".to_string()))?;

        let event = if pinned {
            ChatEvent::MessagePinned {
                message_id,
                pinned_by: actor.id,
                pinned_at: now,
            }
        } else {
            ChatEvent::MessageUnpinned {
                message_id,
                unpinned_by: actor.id,
            }
        };
        if let Err(e) = self.message_pusher.publish(room.id, &event, None).await {
            tracing::warn!("Failed to broadcast {} of {}: {}", event.kind(), message_id, e);
        }
        Ok(updated)
    }
}
