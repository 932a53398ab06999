//! SQLite Repository 実装
//!
//! ドメイン層が定義する全ての Repository trait を1つの `SqlitePool` で実装します。
//! 排他制御はストア自身に任せます：
//!
//! - get-or-create は `INSERT ... ON CONFLICT DO NOTHING` の後に正規の行を読み直す
//! - リアクションの重複は UNIQUE 制約違反として検出する
//! - 編集・削除・ピン留めは `WHERE is_deleted = 0` 付きの条件付き UPDATE

use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::domain::{
    Message, MessageId, MessageRepository, NewMessage, PositionRepository, Reaction,
    ReactionCounts, ReactionKind, ReactionRepository, RepositoryError, Role, Room, RoomId,
    RoomKind, RoomName, RoomRepository, Stamp, Timestamp, UnreadCandidate, User,
    UserChatPosition, UserDirectory, UserId,
};

const SCHEMA: &str = include_str!("schema.sql");

const MESSAGE_COLUMNS: &str = "id, room_id, author_id, content, parent_id, is_deleted, \
     edited_by, edited_at, pinned_by, pinned_at, forwarded_from, created_at";

const ROOM_COLUMNS: &str =
    "id, name, kind, participant_a, participant_b, is_muted, history_cleared, created_at, updated_at";

const POSITION_COLUMNS: &str = "user_id, room_id, last_read_at, last_read_message_id, \
     cached_unread, cached_personal, updated_at";

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.message().to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

/// SQLite-backed persistence gateway
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `database_url` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the database cannot be opened,
    /// or the schema cannot be applied.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Private in-memory database, kept alive on a single connection.
    pub async fn in_memory() -> Result<Self, RepositoryError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::debug!("Database schema applied");
        Ok(())
    }

    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Provision a user record (identity tooling and tests).
    pub async fn insert_user(
        &self,
        username: &str,
        display_name: &str,
        role: Role,
        auth_token: &str,
    ) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO users (username, display_name, role, auth_token) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(display_name)
        .bind(role.as_str())
        .bind(auth_token)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id: UserId::new(result.last_insert_rowid()),
            username: username.to_string(),
            display_name: display_name.to_string(),
            role,
        })
    }
}

// ========================================
// Row types
// ========================================

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    display_name: String,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId::new(row.id),
            username: row.username,
            display_name: row.display_name,
            role: Role::from_str(&row.role)?,
        })
    }
}

#[derive(FromRow)]
struct RoomRow {
    id: i64,
    name: String,
    kind: String,
    participant_a: Option<i64>,
    participant_b: Option<i64>,
    is_muted: bool,
    history_cleared: bool,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<RoomRow> for Room {
    type Error = RepositoryError;

    fn try_from(row: RoomRow) -> Result<Self, Self::Error> {
        let name = RoomName::new(row.name)?;
        let kind = RoomKind::from_name(&name)?;
        if kind.as_str() != row.kind {
            return Err(RepositoryError::Corrupt(format!(
                "room '{}' stored as '{}' but named as '{}'",
                name,
                row.kind,
                kind.as_str()
            )));
        }
        if let RoomKind::Direct { first, second } = kind {
            if row.participant_a != Some(first.value()) || row.participant_b != Some(second.value())
            {
                return Err(RepositoryError::Corrupt(format!(
                    "thread '{name}' has mismatching participants"
                )));
            }
        }
        Ok(Room {
            id: RoomId::new(row.id),
            name,
            kind,
            is_muted: row.is_muted,
            history_cleared: row.history_cleared,
            created_at: Timestamp::new(row.created_at),
            updated_at: Timestamp::new(row.updated_at),
        })
    }
}

#[derive(FromRow)]
struct MessageRow {
    id: i64,
    room_id: i64,
    author_id: i64,
    content: String,
    parent_id: Option<i64>,
    is_deleted: bool,
    edited_by: Option<i64>,
    edited_at: Option<i64>,
    pinned_by: Option<i64>,
    pinned_at: Option<i64>,
    forwarded_from: Option<i64>,
    created_at: i64,
}

fn stamp(by: Option<i64>, at: Option<i64>) -> Option<Stamp> {
    match (by, at) {
        (Some(by), Some(at)) => Some(Stamp {
            by: UserId::new(by),
            at: Timestamp::new(at),
        }),
        _ => None,
    }
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: MessageId::new(row.id),
            room_id: RoomId::new(row.room_id),
            author_id: UserId::new(row.author_id),
            content: row.content,
            parent_id: row.parent_id.map(MessageId::new),
            is_deleted: row.is_deleted,
            edited: stamp(row.edited_by, row.edited_at),
            pinned: stamp(row.pinned_by, row.pinned_at),
            forwarded_from: row.forwarded_from.map(MessageId::new),
            created_at: Timestamp::new(row.created_at),
        }
    }
}

#[derive(FromRow)]
struct PositionRow {
    user_id: i64,
    room_id: i64,
    last_read_at: i64,
    last_read_message_id: Option<i64>,
    cached_unread: i64,
    cached_personal: i64,
    updated_at: i64,
}

impl From<PositionRow> for UserChatPosition {
    fn from(row: PositionRow) -> Self {
        UserChatPosition {
            user_id: UserId::new(row.user_id),
            room_id: RoomId::new(row.room_id),
            last_read_at: Timestamp::new(row.last_read_at),
            last_read_message_id: row.last_read_message_id.map(MessageId::new),
            cached_unread: row.cached_unread,
            cached_personal: row.cached_personal,
            updated_at: Timestamp::new(row.updated_at),
        }
    }
}

#[derive(FromRow)]
struct UnreadRow {
    id: i64,
    content: String,
    parent_author_id: Option<i64>,
}

// ========================================
// Repository implementations
// ========================================

#[async_trait]
impl RoomRepository for SqliteStore {
    async fn resolve_or_create(
        &self,
        name: &RoomName,
        kind: RoomKind,
        now: Timestamp,
    ) -> Result<Room, RepositoryError> {
        let (participant_a, participant_b) = match kind {
            RoomKind::Direct { first, second } => (Some(first.value()), Some(second.value())),
            _ => (None, None),
        };

        let inserted = sqlx::query(
            "INSERT INTO rooms (name, kind, participant_a, participant_b, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT(name) DO NOTHING",
        )
        .bind(name.as_str())
        .bind(kind.as_str())
        .bind(participant_a)
        .bind(participant_b)
        .bind(now.value())
        .bind(now.value())
        .execute(&self.pool)
        .await?;
        if inserted.rows_affected() > 0 {
            tracing::info!("Room '{}' created", name);
        }

        self.find_by_name(name).await?.ok_or_else(|| {
            RepositoryError::Database(format!("room '{name}' vanished after creation"))
        })
    }

    async fn find_by_name(&self, name: &RoomName) -> Result<Option<Room>, RepositoryError> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE name = ?");
        sqlx::query_as::<_, RoomRow>(&sql)
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Room::try_from)
            .transpose()
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?");
        sqlx::query_as::<_, RoomRow>(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await?
            .map(Room::try_from)
            .transpose()
    }

    async fn clear_history(&self, id: RoomId, now: Timestamp) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM reactions WHERE message_id IN (SELECT id FROM messages WHERE room_id = ?)",
        )
        .bind(id.value())
        .execute(&mut *tx)
        .await?;

        let removed = sqlx::query("DELETE FROM messages WHERE room_id = ?")
            .bind(id.value())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query(
            "UPDATE user_chat_positions \
             SET cached_unread = 0, cached_personal = 0, last_read_message_id = NULL, updated_at = ? \
             WHERE room_id = ?",
        )
        .bind(now.value())
        .bind(id.value())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE rooms SET history_cleared = 1, updated_at = ? WHERE id = ?")
            .bind(now.value())
            .bind(id.value())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(removed)
    }

    async fn set_muted(
        &self,
        id: RoomId,
        muted: bool,
        now: Timestamp,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE rooms SET is_muted = ?, updated_at = ? WHERE id = ?")
            .bind(muted)
            .bind(now.value())
            .bind(id.value())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for SqliteStore {
    async fn insert(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO messages (room_id, author_id, content, parent_id, forwarded_from, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(message.room_id.value())
        .bind(message.author_id.value())
        .bind(message.content.as_str())
        .bind(message.parent_id.map(|id| id.value()))
        .bind(message.forwarded_from.map(|id| id.value()))
        .bind(message.created_at.value())
        .execute(&self.pool)
        .await?;

        Ok(Message {
            id: MessageId::new(result.last_insert_rowid()),
            room_id: message.room_id,
            author_id: message.author_id,
            content: message.content.into_string(),
            parent_id: message.parent_id,
            is_deleted: false,
            edited: None,
            pinned: None,
            forwarded_from: message.forwarded_from,
            created_at: message.created_at,
        })
    }

    async fn find(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?");
        Ok(sqlx::query_as::<_, MessageRow>(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await?
            .map(Message::from))
    }

    async fn update_content(
        &self,
        id: MessageId,
        content: &str,
        editor: UserId,
        at: Timestamp,
    ) -> Result<Option<Message>, RepositoryError> {
        let updated = sqlx::query(
            "UPDATE messages SET content = ?, edited_by = ?, edited_at = ? \
             WHERE id = ? AND is_deleted = 0",
        )
        .bind(content)
        .bind(editor.value())
        .bind(at.value())
        .bind(id.value())
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        MessageRepository::find(self, id).await
    }

    async fn soft_delete(
        &self,
        id: MessageId,
        tombstone: &str,
    ) -> Result<Option<Message>, RepositoryError> {
        let updated = sqlx::query(
            "UPDATE messages SET content = ?, is_deleted = 1, pinned_by = NULL, pinned_at = NULL \
             WHERE id = ? AND is_deleted = 0",
        )
        .bind(tombstone)
        .bind(id.value())
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        MessageRepository::find(self, id).await
    }

    async fn set_pinned(
        &self,
        id: MessageId,
        pin: Option<(UserId, Timestamp)>,
    ) -> Result<Option<Message>, RepositoryError> {
        let updated = sqlx::query(
            "UPDATE messages SET pinned_by = ?, pinned_at = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(pin.map(|(by, _)| by.value()))
        .bind(pin.map(|(_, at)| at.value()))
        .bind(id.value())
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        MessageRepository::find(self, id).await
    }

    async fn list_recent(
        &self,
        room_id: RoomId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE room_id = ? AND is_deleted = 0 \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(room_id.value())
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn list_before(
        &self,
        room_id: RoomId,
        before: MessageId,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE room_id = ? AND is_deleted = 0 \
             AND (created_at < (SELECT created_at FROM messages WHERE id = ?) \
                  OR (created_at = (SELECT created_at FROM messages WHERE id = ?) AND id < ?)) \
             ORDER BY created_at DESC, id DESC LIMIT ?"
        );
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(room_id.value())
            .bind(before.value())
            .bind(before.value())
            .bind(before.value())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn count_unread(
        &self,
        room_id: RoomId,
        viewer: UserId,
        since: Timestamp,
    ) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages \
             WHERE room_id = ? AND created_at > ? AND author_id <> ? AND is_deleted = 0",
        )
        .bind(room_id.value())
        .bind(since.value())
        .bind(viewer.value())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list_unread(
        &self,
        room_id: RoomId,
        viewer: UserId,
        since: Timestamp,
    ) -> Result<Vec<UnreadCandidate>, RepositoryError> {
        let rows = sqlx::query_as::<_, UnreadRow>(
            "SELECT m.id AS id, m.content AS content, p.author_id AS parent_author_id \
             FROM messages m LEFT JOIN messages p ON p.id = m.parent_id \
             WHERE m.room_id = ? AND m.created_at > ? AND m.author_id <> ? AND m.is_deleted = 0 \
             ORDER BY m.created_at, m.id",
        )
        .bind(room_id.value())
        .bind(since.value())
        .bind(viewer.value())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| UnreadCandidate {
                id: MessageId::new(row.id),
                content: row.content,
                parent_author_id: row.parent_author_id.map(UserId::new),
            })
            .collect())
    }
}

#[async_trait]
impl ReactionRepository for SqliteStore {
    async fn insert(&self, reaction: &Reaction) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO reactions (message_id, user_id, kind, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(reaction.message_id.value())
        .bind(reaction.user_id.value())
        .bind(reaction.kind.as_str())
        .bind(reaction.created_at.value())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn counts(&self, message_id: MessageId) -> Result<ReactionCounts, RepositoryError> {
        let (likes, dislikes) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT \
               COALESCE(SUM(CASE WHEN kind = 'like' THEN 1 ELSE 0 END), 0), \
               COALESCE(SUM(CASE WHEN kind = 'dislike' THEN 1 ELSE 0 END), 0) \
             FROM reactions WHERE message_id = ?",
        )
        .bind(message_id.value())
        .fetch_one(&self.pool)
        .await?;
        Ok(ReactionCounts { likes, dislikes })
    }

    async fn find_for_user(
        &self,
        message_id: MessageId,
        user_id: UserId,
    ) -> Result<Option<ReactionKind>, RepositoryError> {
        let kind = sqlx::query_scalar::<_, String>(
            "SELECT kind FROM reactions WHERE message_id = ? AND user_id = ?",
        )
        .bind(message_id.value())
        .bind(user_id.value())
        .fetch_optional(&self.pool)
        .await?;
        kind.map(|k| ReactionKind::from_str(&k).map_err(RepositoryError::from))
            .transpose()
    }
}

#[async_trait]
impl PositionRepository for SqliteStore {
    async fn get_or_init(
        &self,
        user_id: UserId,
        room_id: RoomId,
        now: Timestamp,
    ) -> Result<UserChatPosition, RepositoryError> {
        sqlx::query(
            "INSERT INTO user_chat_positions (user_id, room_id, last_read_at, updated_at) \
             VALUES (?, ?, ?, ?) ON CONFLICT(user_id, room_id) DO NOTHING",
        )
        .bind(user_id.value())
        .bind(room_id.value())
        .bind(now.value())
        .bind(now.value())
        .execute(&self.pool)
        .await?;

        self.fetch_position(user_id, room_id).await
    }

    async fn move_cursor(
        &self,
        user_id: UserId,
        room_id: RoomId,
        last_read_at: Timestamp,
        last_read_message_id: Option<MessageId>,
        now: Timestamp,
    ) -> Result<UserChatPosition, RepositoryError> {
        sqlx::query(
            "INSERT INTO user_chat_positions \
               (user_id, room_id, last_read_at, last_read_message_id, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(user_id, room_id) DO UPDATE SET \
               last_read_at = excluded.last_read_at, \
               last_read_message_id = excluded.last_read_message_id, \
               updated_at = excluded.updated_at",
        )
        .bind(user_id.value())
        .bind(room_id.value())
        .bind(last_read_at.value())
        .bind(last_read_message_id.map(|id| id.value()))
        .bind(now.value())
        .execute(&self.pool)
        .await?;

        self.fetch_position(user_id, room_id).await
    }

    async fn store_counters(
        &self,
        user_id: UserId,
        room_id: RoomId,
        unread: i64,
        personal: i64,
        now: Timestamp,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE user_chat_positions SET cached_unread = ?, cached_personal = ?, updated_at = ? \
             WHERE user_id = ? AND room_id = ?",
        )
        .bind(unread)
        .bind(personal)
        .bind(now.value())
        .bind(user_id.value())
        .bind(room_id.value())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl SqliteStore {
    async fn fetch_position(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<UserChatPosition, RepositoryError> {
        let sql = format!(
            "SELECT {POSITION_COLUMNS} FROM user_chat_positions WHERE user_id = ? AND room_id = ?"
        );
        let row = sqlx::query_as::<_, PositionRow>(&sql)
            .bind(user_id.value())
            .bind(room_id.value())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }
}

#[async_trait]
impl UserDirectory for SqliteStore {
    async fn authenticate(&self, token: &str) -> Result<Option<User>, RepositoryError> {
        if token.is_empty() {
            return Ok(None);
        }
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, display_name, role FROM users WHERE auth_token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn find(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, display_name, role FROM users WHERE id = ?",
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }
}
