//! UseCase: 既読位置と未読数
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ReadPositionUseCase の get_or_init / snapshot / mark_as_read
//!
//! ### なぜこのテストが必要か
//! - 初回訪問時は「今」で既読位置を初期化してから未読数を報告する
//!   （既存の履歴が未読として数えられないことを保証）
//! - 未読数は要求のたびにストアから再計算され、キャッシュはその後で書き戻す
//! - 個人向け通知数（自分への返信・メンション）の判定
//!
//! ### どのような状況を想定しているか
//! - 正常系：初回訪問、新着後の再計算、mark_as_read 直後の 0
//! - 異常系：別ルームのメッセージ、解釈できない時刻
//! - エッジケース：削除済み・自分のメッセージは未読に数えない

use std::sync::Arc;

use kaiwa_shared::time::{Clock, parse_rfc3339_millis};

use crate::domain::{
    MessageId, MessageRepository, PositionRepository, Room, Timestamp, UnreadCandidate,
    UnreadSnapshot, User, UserChatPosition, mention::MentionMatcher,
};

use super::error::ChatError;

/// Where `mark_as_read` moves the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMark {
    Now,
    UpToMessage(MessageId),
    UpToTime(Timestamp),
}

impl ReadMark {
    /// Build from the optional envelope fields; a message id wins over a time
    pub fn from_request(
        message_id: Option<i64>,
        up_to_time: Option<&str>,
    ) -> Result<Self, ChatError> {
        match (message_id, up_to_time) {
            (Some(id), _) => Ok(ReadMark::UpToMessage(MessageId::new(id))),
            (None, Some(text)) => parse_rfc3339_millis(text)
                .map(|millis| ReadMark::UpToTime(Timestamp::new(millis)))
                .ok_or_else(|| ChatError::Validation(format!("invalid timestamp: '{text}'"))),
            (None, None) => Ok(ReadMark::Now),
        }
    }
}

/// 既読位置トラッカー
pub struct ReadPositionUseCase {
    positions: Arc<dyn PositionRepository>,
    messages: Arc<dyn MessageRepository>,
    clock: Arc<dyn Clock>,
    /// メンションとして扱う別名（例: `all`）
    mention_aliases: Vec<String>,
}

impl ReadPositionUseCase {
    pub fn new(
        positions: Arc<dyn PositionRepository>,
        messages: Arc<dyn MessageRepository>,
        clock: Arc<dyn Clock>,
        mention_aliases: Vec<String>,
    ) -> Self {
        Self {
            positions,
            messages,
            clock,
            mention_aliases,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// Existing cursor, or a new one at "now" on the first visit
    pub async fn get_or_init(
        &self,
        user: &User,
        room: &Room,
    ) -> Result<UserChatPosition, ChatError> {
        Ok(self
            .positions
            .get_or_init(user.id, room.id, self.now())
            .await?)
    }

    /// Authoritative unread count
    pub async fn unread_count(&self, user: &User, room: &Room) -> Result<i64, ChatError> {
        let position = self.get_or_init(user, room).await?;
        Ok(self
            .messages
            .count_unread(room.id, user.id, position.last_read_at)
            .await?)
    }

    /// Unread messages replying to `user` or mentioning them
    pub async fn personal_notification_count(
        &self,
        user: &User,
        room: &Room,
    ) -> Result<i64, ChatError> {
        let position = self.get_or_init(user, room).await?;
        let candidates = self
            .messages
            .list_unread(room.id, user.id, position.last_read_at)
            .await?;
        Ok(self.count_personal(user, &candidates))
    }

    /// Recompute both counters from one read, then write them back to the cached fields
    pub async fn snapshot(&self, user: &User, room: &Room) -> Result<UnreadSnapshot, ChatError> {
        let position = self.get_or_init(user, room).await?;
        let since = position.last_read_at;

        let candidates = self.messages.list_unread(room.id, user.id, since).await?;
        let unread_count = candidates.len() as i64;
        let personal_count = self.count_personal(user, &candidates);

        self.positions
            .store_counters(user.id, room.id, unread_count, personal_count, self.now())
            .await?;

        Ok(UnreadSnapshot {
            unread_count,
            personal_count,
            last_read_at: since,
        })
    }

    /// Move the cursor, then recompute and persist the counters
    pub async fn mark_as_read(
        &self,
        user: &User,
        room: &Room,
        mark: ReadMark,
    ) -> Result<UnreadSnapshot, ChatError> {
        let now = self.now();
        let (last_read_at, last_read_message_id) = match mark {
            ReadMark::Now => (now, None),
            ReadMark::UpToTime(at) => (at, None),
            ReadMark::UpToMessage(id) => match self.messages.find(id).await? {
                Some(message) if message.room_id == room.id => {
                    (message.created_at, Some(message.id))
                }
                _ => return Err(ChatError::NotFound("Message not found".to_string())),
            },
        };

        self.positions
            .move_cursor(user.id, room.id, last_read_at, last_read_message_id, now)
            .await?;
        tracing::debug!(
            "User '{}' marked '{}' read up to {}",
            user.username,
            room.name,
            last_read_at.value()
        );
        self.snapshot(user, room).await
    }

    fn count_personal(&self, user: &User, candidates: &[UnreadCandidate]) -> i64 {
        let matcher = match MentionMatcher::new(user, &self.mention_aliases) {
            Ok(matcher) => Some(matcher),
            Err(e) => {
                tracing::warn!("Mention pattern for '{}' unusable: {}", user.username, e);
                None
            }
        };
        let personal = candidates
            .iter()
            .filter(|candidate| {
                candidate.parent_author_id == Some(user.id)
                    || matcher
                        .as_ref()
                        .is_some_and(|m| m.matches(&candidate.content))
            })
            .count();
        i64::try_from(personal).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MessageContent, MockMessageRepository, NewMessage, Role},
        usecase::test_support::Fixture,
    };

    fn create_usecase(fx: &Fixture) -> ReadPositionUseCase {
        ReadPositionUseCase::new(
            fx.store.clone(),
            fx.store.clone(),
            fx.clock.clone(),
            vec!["all".to_string(), "everyone".to_string()],
        )
    }

    #[tokio::test]
    async fn test_first_visit_reports_zero_unread_despite_history() {
        // テスト項目: 初回訪問時は既存の履歴があっても未読数は 0
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::Vip).await;
        let bob = fx.user("bob", Role::Vip).await;
        let vip = fx.room("vip").await;
        for text in ["one", "two", "three"] {
            fx.post(&vip, &alice, text).await;
        }
        let usecase = create_usecase(&fx);

        // when (操作):
        let first = usecase.snapshot(&bob, &vip).await.unwrap();
        fx.post(&vip, &alice, "four").await;
        let after_new = usecase.unread_count(&bob, &vip).await.unwrap();

        // then (期待する結果):
        assert_eq!(first.unread_count, 0);
        assert_eq!(after_new, 1);
    }

    #[tokio::test]
    async fn test_mark_as_read_then_unread_is_zero() {
        // テスト項目: mark_as_read 直後の未読数は履歴の深さに関わらず 0
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let bob = fx.user("bob", Role::User).await;
        let general = fx.room("general").await;
        let usecase = create_usecase(&fx);
        usecase.get_or_init(&bob, &general).await.unwrap();
        for i in 0..20 {
            fx.post(&general, &alice, &format!("m{i}")).await;
        }
        assert_eq!(usecase.unread_count(&bob, &general).await.unwrap(), 20);

        // when (操作):
        let snapshot = usecase
            .mark_as_read(&bob, &general, ReadMark::Now)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(snapshot.unread_count, 0);
        assert_eq!(usecase.unread_count(&bob, &general).await.unwrap(), 0);
        let cached = usecase.get_or_init(&bob, &general).await.unwrap();
        assert_eq!(cached.cached_unread, 0);
    }

    #[tokio::test]
    async fn test_mark_as_read_up_to_message() {
        // テスト項目: 指定メッセージまで既読にすると、それ以降のみが未読になる
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let bob = fx.user("bob", Role::User).await;
        let general = fx.room("general").await;
        let usecase = create_usecase(&fx);
        usecase.get_or_init(&bob, &general).await.unwrap();
        let first = fx.post(&general, &alice, "a").await;
        fx.post(&general, &alice, "b").await;
        fx.post(&general, &alice, "c").await;

        // when (操作):
        let snapshot = usecase
            .mark_as_read(&bob, &general, ReadMark::UpToMessage(first.id))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(snapshot.unread_count, 2);
        assert_eq!(snapshot.last_read_at, first.created_at);
        let position = usecase.get_or_init(&bob, &general).await.unwrap();
        assert_eq!(position.last_read_message_id, Some(first.id));
        assert_eq!(position.cached_unread, 2);
    }

    #[tokio::test]
    async fn test_mark_as_read_rejects_foreign_message_and_bad_time() {
        // テスト項目: 別ルームのメッセージは NotFound、解釈できない時刻は Validation
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let general = fx.room("general").await;
        let other = fx.room("random").await;
        let foreign = fx.post(&other, &alice, "elsewhere").await;
        let usecase = create_usecase(&fx);

        // when (操作):
        let result = usecase
            .mark_as_read(&alice, &general, ReadMark::UpToMessage(foreign.id))
            .await;
        let parsed = ReadMark::from_request(None, Some("yesterday"));

        // then (期待する結果):
        assert!(matches!(result, Err(ChatError::NotFound(_))));
        assert!(matches!(parsed, Err(ChatError::Validation(_))));
        assert_eq!(ReadMark::from_request(None, None), Ok(ReadMark::Now));
        assert_eq!(
            ReadMark::from_request(Some(4), Some("yesterday")),
            Ok(ReadMark::UpToMessage(MessageId::new(4)))
        );
    }

    #[tokio::test]
    async fn test_own_and_deleted_messages_are_not_unread() {
        // テスト項目: 自分のメッセージと削除済みメッセージは未読に数えない
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let bob = fx.user("bob", Role::User).await;
        let general = fx.room("general").await;
        let usecase = create_usecase(&fx);
        usecase.get_or_init(&bob, &general).await.unwrap();
        fx.post(&general, &bob, "mine").await;
        let deleted = fx.post(&general, &alice, "oops").await;
        fx.store.soft_delete(deleted.id, "x").await.unwrap();
        fx.post(&general, &alice, "real").await;

        // when (操作):
        let unread = usecase.unread_count(&bob, &general).await.unwrap();

        // then (期待する結果):
        assert_eq!(unread, 1);
    }

    #[tokio::test]
    async fn test_personal_count_covers_replies_and_mentions() {
        // テスト項目: 自分への返信・メンション・別名メンションが個人向け通知として数えられる
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let bob = fx.user("bob", Role::User).await;
        let general = fx.room("general").await;
        let bobs = fx.post(&general, &bob, "question").await;
        let usecase = create_usecase(&fx);
        usecase
            .mark_as_read(&bob, &general, ReadMark::Now)
            .await
            .unwrap();

        MessageRepository::insert(
            fx.store.as_ref(),
            NewMessage {
                room_id: general.id,
                author_id: alice.id,
                content: MessageContent::new("answer".to_string()).unwrap(),
                parent_id: Some(bobs.id),
                forwarded_from: None,
                created_at: fx.now(),
            },
        )
        .await
        .unwrap();
        fx.post(&general, &alice, "hey @BOB look").await;
        fx.post(&general, &alice, "@everyone meeting").await;
        fx.post(&general, &alice, "bob without at-sign").await;
        fx.post(&general, &alice, "mail bob@example.com").await;

        // when (操作):
        let personal = usecase
            .personal_notification_count(&bob, &general)
            .await
            .unwrap();
        let snapshot = usecase.snapshot(&bob, &general).await.unwrap();

        // then (期待する結果):
        assert_eq!(personal, 3);
        assert_eq!(snapshot.unread_count, 5);
        assert_eq!(snapshot.personal_count, 3);
    }

    #[tokio::test]
    async fn test_snapshot_counts_come_from_a_single_read() {
        // テスト項目: snapshot の未読数と個人通知数は同じ読み取り結果から計算され、個人通知数が未読数を超えない
        // given (前提条件):
        let fx = Fixture::new().await;
        let alice = fx.user("alice", Role::User).await;
        let general = fx.room("general").await;
        let mut messages = MockMessageRepository::new();
        // 別クエリの件数は使わない（読み取りの間に挿入されると食い違うため）
        messages.expect_count_unread().times(0);
        messages.expect_list_unread().times(1).returning(|_, _, _| {
            Ok(vec![
                UnreadCandidate {
                    id: MessageId::new(1),
                    content: "hey @alice".to_string(),
                    parent_author_id: None,
                },
                UnreadCandidate {
                    id: MessageId::new(2),
                    content: "@everyone lunch".to_string(),
                    parent_author_id: None,
                },
            ])
        });
        let usecase = ReadPositionUseCase::new(
            fx.store.clone(),
            Arc::new(messages),
            fx.clock.clone(),
            vec!["everyone".to_string()],
        );

        // when (操作):
        let snapshot = usecase.snapshot(&alice, &general).await.unwrap();

        // then (期待する結果):
        assert_eq!(snapshot.unread_count, 2);
        assert_eq!(snapshot.personal_count, 2);
        let stored = fx
            .store
            .get_or_init(alice.id, general.id, fx.now())
            .await
            .unwrap();
        assert_eq!(stored.cached_unread, 2);
    }
}
