//! UseCase: 履歴取得（ページング）
//!
//! ストアからは新しい順に取得し、クライアントには時系列順で返します。
//! `has_more` は「返した件数 == ページサイズ」で判定します。

use std::sync::Arc;

use crate::domain::{Message, MessageId, MessageRepository, MessageView, Room, User};

use super::{error::ChatError, message_view::MessageViewBuilder};

/// One page of history in chronological order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePage {
    pub messages: Vec<MessageView>,
    pub has_more: bool,
}

/// 履歴取得のユースケース
pub struct FetchMessagesUseCase {
    messages: Arc<dyn MessageRepository>,
    views: Arc<MessageViewBuilder>,
    page_size: u32,
}

impl FetchMessagesUseCase {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        views: Arc<MessageViewBuilder>,
        page_size: u32,
    ) -> Self {
        Self {
            messages,
            views,
            page_size,
        }
    }

    /// 1-based page counted back from the newest message
    pub async fn page(
        &self,
        room: &Room,
        viewer: &User,
        page: u32,
    ) -> Result<MessagePage, ChatError> {
        let offset = page.max(1).saturating_sub(1).saturating_mul(self.page_size);
        let newest_first = self
            .messages
            .list_recent(room.id, self.page_size, offset)
            .await?;
        self.into_page(newest_first, room, viewer).await
    }

    /// Page of messages older than `before`, or the newest page without a cursor
    pub async fn before(
        &self,
        room: &Room,
        viewer: &User,
        before: Option<MessageId>,
    ) -> Result<MessagePage, ChatError> {
        let newest_first = match before {
            Some(cursor) => {
                self.messages
                    .list_before(room.id, cursor, self.page_size)
                    .await?
            }
            None => self.messages.list_recent(room.id, self.page_size, 0).await?,
        };
        self.into_page(newest_first, room, viewer).await
    }

    async fn into_page(
        &self,
        mut newest_first: Vec<Message>,
        room: &Room,
        viewer: &User,
    ) -> Result<MessagePage, ChatError> {
        let has_more = newest_first.len() == self.page_size as usize;
        newest_first.reverse();
        let messages = self
            .views
            .build_all(newest_first, &room.name, viewer.id)
            .await?;
        Ok(MessagePage { messages, has_more })
    }
}
