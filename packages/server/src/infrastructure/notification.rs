//! Notification-center sink backed by structured logs.

use async_trait::async_trait;

use crate::domain::{Message, NotificationError, NotificationSink, Room, User};

/// Emits one `tracing` event per signalled message.
#[derive(Debug, Default, Clone)]
pub struct TracingNotificationSink;

impl TracingNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn notify_new_message(
        &self,
        room: &Room,
        message: &Message,
        author: &User,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            room = %room.name,
            kind = room.kind.as_str(),
            message_id = %message.id,
            author = %author.username,
            "notification: new message in '{}'",
            room.display_name()
        );
        Ok(())
    }
}
