//! Notification-center sink port.

use async_trait::async_trait;

use super::{
    entity::{Message, Room, User},
    error::NotificationError,
};

/// Best-effort signal for new messages in scoped rooms.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify_new_message(
        &self,
        room: &Room,
        message: &Message,
        author: &User,
    ) -> Result<(), NotificationError>;
}
