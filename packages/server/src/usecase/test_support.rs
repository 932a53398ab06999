//! UseCase テスト用のフィクスチャ

use std::sync::Arc;

use kaiwa_shared::time::{Clock, TickingClock};
use tokio::sync::mpsc;

use crate::{
    domain::{
        ConnectionId, Message, MessageContent, MessagePusher, MessageRepository, NewMessage,
        OnlineMember, Role, Room, RoomKind, RoomName, RoomRepository, Timestamp, User,
    },
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::SqliteStore},
};

use super::message_view::MessageViewBuilder;

/// In-memory store, real broadcast hub and a strictly increasing clock
pub(crate) struct Fixture {
    pub store: Arc<SqliteStore>,
    pub pusher: Arc<WebSocketMessagePusher>,
    pub clock: Arc<TickingClock>,
    pub views: Arc<MessageViewBuilder>,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let views = Arc::new(MessageViewBuilder::new(
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        Self {
            store,
            pusher: Arc::new(WebSocketMessagePusher::new()),
            clock: Arc::new(TickingClock::new(1_000, 10)),
            views,
        }
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    pub async fn user(&self, username: &str, role: Role) -> User {
        let mut display_name = username.to_string();
        if let Some(first) = display_name.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        self.store
            .insert_user(username, &display_name, role, &format!("{username}-token"))
            .await
            .unwrap()
    }

    pub async fn room(&self, name: &str) -> Room {
        let name = RoomName::new(name.to_string()).unwrap();
        let kind = RoomKind::from_name(&name).unwrap();
        let now = self.now();
        self.store.resolve_or_create(&name, kind, now).await.unwrap()
    }

    /// Persist a message directly, bypassing the lifecycle use cases
    pub async fn post(&self, room: &Room, author: &User, text: &str) -> Message {
        let now = self.now();
        MessageRepository::insert(
            self.store.as_ref(),
            NewMessage {
                room_id: room.id,
                author_id: author.id,
                content: MessageContent::new(text.to_string()).unwrap(),
                parent_id: None,
                forwarded_from: None,
                created_at: now,
            },
        )
        .await
        .unwrap()
    }

    /// Join a fake connection to the room's broadcast group
    pub async fn join(
        &self,
        room: &Room,
        user: &User,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = ConnectionId::generate();
        self.pusher
            .join(room.id, connection_id, OnlineMember::from(user), tx)
            .await;
        (connection_id, rx)
    }
}

/// Every frame currently queued on a connection, decoded
pub(crate) fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<serde_json::Value> {
    let mut frames = Vec::new();
    while let Ok(text) = rx.try_recv() {
        frames.push(serde_json::from_str(&text).unwrap());
    }
    frames
}

/// Frame types currently queued on a connection
pub(crate) fn drain_types(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    drain(rx)
        .into_iter()
        .map(|frame| frame["type"].as_str().unwrap_or_default().to_string())
        .collect()
}
