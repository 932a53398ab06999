//! 閲覧者向けのメッセージ表現（MessageView）の組み立て
//!
//! 作成者・返信元の要約・リアクション集計を Repository から読み込みます。
//! リアクション集計は毎回台帳から再計算し、キャッシュしません。

use std::sync::Arc;

use crate::domain::{
    Message, MessageId, MessageRepository, MessageView, ReactionRepository, ReplySummary, RoomId,
    RoomName, UNKNOWN_AUTHOR, UserDirectory, UserId,
};

use super::error::ChatError;

pub struct MessageViewBuilder {
    messages: Arc<dyn MessageRepository>,
    reactions: Arc<dyn ReactionRepository>,
    users: Arc<dyn UserDirectory>,
}

impl MessageViewBuilder {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        reactions: Arc<dyn ReactionRepository>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            messages,
            reactions,
            users,
        }
    }

    /// Load a message that exists in `room_id` and is not soft-deleted
    pub async fn find_live(&self, id: MessageId, room_id: RoomId) -> Result<Message, ChatError> {
        match self.messages.find(id).await? {
            Some(message) if message.room_id == room_id && !message.is_deleted => Ok(message),
            _ => Err(ChatError::NotFound("Message not found".to_string())),
        }
    }

    /// Enrich a message; `viewer` decides `my_reaction` and is `None` for broadcasts
    pub async fn build(
        &self,
        message: Message,
        room_name: &RoomName,
        viewer: Option<UserId>,
    ) -> Result<MessageView, ChatError> {
        let author = self.users.find(message.author_id).await?;

        let reply = match message.parent_id {
            Some(parent_id) => match self.messages.find(parent_id).await? {
                Some(parent) => {
                    let name = self.display_name_of(parent.author_id).await?;
                    Some(ReplySummary::new(&parent, name))
                }
                None => None,
            },
            None => None,
        };

        let reactions = self.reactions.counts(message.id).await?;
        let my_reaction = match viewer {
            Some(viewer) => self.reactions.find_for_user(message.id, viewer).await?,
            None => None,
        };

        Ok(MessageView {
            message,
            room_name: room_name.clone(),
            author,
            reply,
            reactions,
            my_reaction,
        })
    }

    /// Enrich a page of messages, keeping their order
    pub async fn build_all(
        &self,
        messages: Vec<Message>,
        room_name: &RoomName,
        viewer: UserId,
    ) -> Result<Vec<MessageView>, ChatError> {
        let mut views = Vec::with_capacity(messages.len());
        for message in messages {
            views.push(self.build(message, room_name, Some(viewer)).await?);
        }
        Ok(views)
    }

    pub async fn display_name_of(&self, user_id: UserId) -> Result<String, ChatError> {
        Ok(self
            .users
            .find(user_id)
            .await?
            .map(|user| user.display_name)
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()))
    }
}
