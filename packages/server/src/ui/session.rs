//! Per-connection protocol session.
//!
//! A session is `Connecting` until the connect use case has run, `Joined`
//! while it dispatches inbound envelopes, and `Closed` once it has left its
//! room. Nothing is dispatched outside `Joined`.

use std::sync::Arc;

use crate::{
    domain::{ChatEvent, ConnectionId, MessageId, PusherChannel, Room, User},
    infrastructure::dto::websocket::{ClientMessage, DecodeError},
    usecase::{ChatError, ReadMark},
};

use super::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Joined,
    Closed,
}

pub struct ChatSession {
    state: Arc<AppState>,
    room: Room,
    user: User,
    connection_id: ConnectionId,
    phase: SessionPhase,
}

impl ChatSession {
    pub fn new(state: Arc<AppState>, room: Room, user: User) -> Self {
        Self {
            state,
            room,
            user,
            connection_id: ConnectionId::generate(),
            phase: SessionPhase::Connecting,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Join the room's broadcast group and report the unread counters
    pub async fn join(&mut self, sender: PusherChannel) {
        if self.phase != SessionPhase::Connecting {
            return;
        }
        let joined = self
            .state
            .connect_participant_usecase
            .execute(&self.room, &self.user, self.connection_id, sender)
            .await;
        self.phase = SessionPhase::Joined;
        if let Err(e) = joined {
            self.reply_error(&e).await;
        }
    }

    /// Decode and dispatch one text frame
    pub async fn handle_text(&mut self, text: &str) {
        if self.phase != SessionPhase::Joined {
            tracing::debug!("Frame ignored on {} ({:?})", self.connection_id, self.phase);
            return;
        }
        let message = match ClientMessage::decode(text) {
            Ok(message) => message,
            Err(DecodeError::UnknownType(kind)) => {
                tracing::warn!(
                    "Unknown envelope type '{}' from '{}'; ignored",
                    kind,
                    self.user.username
                );
                return;
            }
            Err(DecodeError::Malformed(reason)) => {
                tracing::warn!(
                    "Malformed envelope from '{}': {}",
                    self.user.username,
                    reason
                );
                return;
            }
        };

        if let Err(e) = self.dispatch(message).await {
            self.reply_error(&e).await;
        }
    }

    /// Leave the room; no frame is dispatched afterwards
    pub async fn close(&mut self) {
        if self.phase == SessionPhase::Closed {
            return;
        }
        if self.phase == SessionPhase::Joined {
            self.state
                .disconnect_participant_usecase
                .execute(&self.room, &self.user, self.connection_id)
                .await;
        }
        self.phase = SessionPhase::Closed;
    }

    async fn dispatch(&self, message: ClientMessage) -> Result<(), ChatError> {
        let state = &self.state;
        let (room, user) = (&self.room, &self.user);
        match message {
            ClientMessage::Message {
                message,
                reply_to_id,
            } => {
                state
                    .send_message_usecase
                    .execute(room, user, message, reply_to_id.map(MessageId::new))
                    .await?;
            }
            ClientMessage::FetchMessages { page } => {
                let page = page.unwrap_or(1).max(1);
                let result = state.fetch_messages_usecase.page(room, user, page).await?;
                self.reply(&ChatEvent::MessagesHistory {
                    messages: result.messages,
                    page,
                    has_more: result.has_more,
                })
                .await;
            }
            ClientMessage::LoadMoreMessages { before_message_id } => {
                let result = state
                    .fetch_messages_usecase
                    .before(room, user, before_message_id.map(MessageId::new))
                    .await?;
                self.reply(&ChatEvent::MoreMessages {
                    messages: result.messages,
                    has_more: result.has_more,
                })
                .await;
            }
            ClientMessage::FetchOnlineUsers {} => {
                if let Err(e) = state
                    .presence_usecase
                    .online_users(room, self.connection_id)
                    .await
                {
                    tracing::warn!("Failed to send online users: {}", e);
                }
            }
            ClientMessage::Typing { is_typing } => {
                if let Err(e) = state
                    .presence_usecase
                    .typing(room, user, self.connection_id, is_typing)
                    .await
                {
                    tracing::warn!("Failed to relay typing: {}", e);
                }
            }
            ClientMessage::Reaction {
                message_id,
                reaction,
            } => {
                state
                    .react_to_message_usecase
                    .execute(room, user, MessageId::new(message_id), &reaction)
                    .await?;
            }
            ClientMessage::EditMessage {
                message_id,
                new_content,
            } => {
                state
                    .edit_message_usecase
                    .execute(room, user, MessageId::new(message_id), new_content)
                    .await?;
            }
            ClientMessage::DeleteMessage { message_id } => {
                state
                    .delete_message_usecase
                    .execute(room, user, MessageId::new(message_id))
                    .await?;
            }
            ClientMessage::ForwardMessage {
                message_id,
                target_room,
                custom_message,
            } => {
                state
                    .forward_message_usecase
                    .execute(
                        room,
                        user,
                        MessageId::new(message_id),
                        target_room,
                        custom_message,
                    )
                    .await?;
            }
            ClientMessage::PinMessage { message_id } => {
                state
                    .pin_message_usecase
                    .execute(room, user, MessageId::new(message_id), true)
                    .await?;
            }
            ClientMessage::UnpinMessage { message_id } => {
                state
                    .pin_message_usecase
                    .execute(room, user, MessageId::new(message_id), false)
                    .await?;
            }
            ClientMessage::MarkAsRead {
                message_id,
                up_to_time,
            } => {
                let mark = ReadMark::from_request(message_id, up_to_time.as_deref())?;
                let snapshot = state
                    .read_position_usecase
                    .mark_as_read(user, room, mark)
                    .await?;
                self.reply(&ChatEvent::UnreadInfo(snapshot)).await;
            }
            ClientMessage::GetUnreadInfo {} => {
                let snapshot = state.read_position_usecase.snapshot(user, room).await?;
                self.reply(&ChatEvent::UnreadInfo(snapshot)).await;
            }
            ClientMessage::ClearHistory {} => {
                state.clear_history_usecase.execute(room, user).await?;
            }
            ClientMessage::SetMuted { muted } => {
                state.mute_room_usecase.execute(room, user, muted).await?;
            }
        }
        Ok(())
    }

    async fn reply(&self, event: &ChatEvent) {
        if let Err(e) = self
            .state
            .message_pusher
            .push_to(self.connection_id, event)
            .await
        {
            tracing::warn!(
                "Failed to reply '{}' to {}: {}",
                event.kind(),
                self.connection_id,
                e
            );
        }
    }

    async fn reply_error(&self, error: &ChatError) {
        match error {
            ChatError::Store(e) => {
                tracing::error!("Store failure for '{}': {}", self.user.username, e)
            }
            other => tracing::debug!("Rejected request from '{}': {}", self.user.username, other),
        }
        self.reply(&ChatEvent::Error {
            message: error.client_message(),
        })
        .await;
    }
}
