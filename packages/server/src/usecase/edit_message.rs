//! UseCase: メッセージ編集処理

use std::sync::Arc;

use kaiwa_shared::time::Clock;

use crate::domain::{
    ChatEvent, Message, MessageContent, MessageId, MessagePusher, MessageRepository, Room,
    Timestamp, User, UserDirectory,
    policy::{Operation, authorize, message_target},
};

use super::{error::ChatError, message_view::MessageViewBuilder};

/// メッセージ編集のユースケース
pub struct EditMessageUseCase {
    messages: Arc<dyn MessageRepository>,
    users: Arc<dyn UserDirectory>,
    views: Arc<MessageViewBuilder>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl EditMessageUseCase {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        users: Arc<dyn UserDirectory>,
        views: Arc<MessageViewBuilder>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            messages,
            users,
            views,
            message_pusher,
            clock,
        }
    }

    /// Replace the body and stamp the editor, then broadcast `message_edited`
    pub async fn execute(
        &self,
        room: &Room,
        actor: &User,
        message_id: MessageId,
        new_body: String,
    ) -> Result<Message, ChatError> {
        let message = self.views.find_live(message_id, room.id).await?;
        let author = self.users.find(message.author_id).await?;
        let target = message_target(actor, &message, author.as_ref());
        if !authorize(Operation::Edit, actor.role, target).is_allowed() {
            tracing::info!(
                "User '{}' may not edit message {}",
                actor.username,
                message_id
            );
            return Err(ChatError::PermissionDenied);
        }
        let content = MessageContent::new(new_body)?;

        let now = Timestamp::new(self.clock.now_millis());
        let edited = self
            .messages
            .update_content(message_id, content.as_str(), actor.id, now)
            .await?
            .ok_or_else(|| ChatError::NotFound("Message not found".to_string()))?;

        let view = self.views.build(edited.clone(), &room.name, None).await?;
        if let Err(e) = self
            .message_pusher
            .publish(room.id, &ChatEvent::MessageEdited(view), None)
            .await
        {
            tracing::warn!("Failed to broadcast edit of {}: {}", message_id, e);
        }
        Ok(edited)
    }
}
