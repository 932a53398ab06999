//! UseCase: リアクション（取り消し不可）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ReactToMessageUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - (メッセージ, ユーザー) ごとにリアクションは1つだけ。最初のリアクションが永続する
//! - 集計は毎回台帳から再計算される
//!
//! ### どのような状況を想定しているか
//! - 正常系：リアクションと集計のブロードキャスト
//! - 異常系：未知の種類、自分のメッセージ、二重リアクション

use std::sync::Arc;

use kaiwa_shared::time::Clock;

use crate::domain::{
    ChatEvent, MessageId, MessagePusher, Reaction, ReactionCounts, ReactionKind,
    ReactionRepository, RepositoryError, Room, Timestamp, User,
};

use super::{error::ChatError, message_view::MessageViewBuilder};

/// リアクションのユースケース
pub struct ReactToMessageUseCase {
    reactions: Arc<dyn ReactionRepository>,
    views: Arc<MessageViewBuilder>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ReactToMessageUseCase {
    pub fn new(
        reactions: Arc<dyn ReactionRepository>,
        views: Arc<MessageViewBuilder>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reactions,
            views,
            message_pusher,
            clock,
        }
    }

    /// Record the reaction and broadcast the refreshed counts
    pub async fn execute(
        &self,
        room: &Room,
        actor: &User,
        message_id: MessageId,
        kind: &str,
    ) -> Result<ReactionCounts, ChatError> {
        let kind: ReactionKind = kind.parse()?;
        let message = self.views.find_live(message_id, room.id).await?;
        if message.author_id == actor.id {
            return Err(ChatError::PermissionDenied);
        }

        let reaction = Reaction {
            message_id,
            user_id: actor.id,
            kind,
            created_at: Timestamp::new(self.clock.now_millis()),
        };
        self.reactions
            .insert(&reaction)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ChatError::Conflict(
                    "You have already reacted to this message".to_string(),
                ),
                other => ChatError::Store(other),
            })?;

        let counts = self.reactions.counts(message_id).await?;
        let event = ChatEvent::ReactionUpdated {
            message_id,
            counts,
            user_id: actor.id,
            kind,
        };
        if let Err(e) = self.message_pusher.publish(room.id, &event, None).await {
            tracing::warn!("Failed to broadcast reaction on {}: {}", message_id, e);
        }
        Ok(counts)
    }
}
