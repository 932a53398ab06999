//! Server state and dependency wiring.

use std::sync::Arc;

use kaiwa_shared::time::Clock;

use crate::{
    config::{ChatConfig, HeartbeatConfig},
    domain::{
        MessagePusher, MessageRepository, NotificationSink, PositionRepository,
        ReactionRepository, RoomRepository, UserDirectory,
    },
    usecase::{
        ClearHistoryUseCase, ConnectParticipantUseCase, DeleteMessageUseCase,
        DisconnectParticipantUseCase, EditMessageUseCase, FetchMessagesUseCase,
        ForwardMessageUseCase, GetRoomDetailUseCase, MessageViewBuilder, MuteRoomUseCase,
        PinMessageUseCase,
        PresenceUseCase, ReactToMessageUseCase, ReadPositionUseCase, SendMessageUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// ConnectParticipantUseCase（参加者接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（参加者切断のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub edit_message_usecase: Arc<EditMessageUseCase>,
    pub delete_message_usecase: Arc<DeleteMessageUseCase>,
    pub pin_message_usecase: Arc<PinMessageUseCase>,
    pub forward_message_usecase: Arc<ForwardMessageUseCase>,
    pub react_to_message_usecase: Arc<ReactToMessageUseCase>,
    pub fetch_messages_usecase: Arc<FetchMessagesUseCase>,
    pub read_position_usecase: Arc<ReadPositionUseCase>,
    pub presence_usecase: Arc<PresenceUseCase>,
    pub clear_history_usecase: Arc<ClearHistoryUseCase>,
    pub mute_room_usecase: Arc<MuteRoomUseCase>,
    /// GetRoomDetailUseCase（ルーム詳細取得のユースケース）
    pub get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
    /// MessagePusher（プライベート返信に使用）
    pub message_pusher: Arc<dyn MessagePusher>,
    pub heartbeat: HeartbeatConfig,
}

impl AppState {
    /// Wire every use case to one store, one broadcast hub and one clock
    pub fn new<S>(
        store: Arc<S>,
        message_pusher: Arc<dyn MessagePusher>,
        notifications: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        config: &ChatConfig,
    ) -> Self
    where
        S: RoomRepository
            + MessageRepository
            + ReactionRepository
            + PositionRepository
            + UserDirectory
            + 'static,
    {
        let views = Arc::new(MessageViewBuilder::new(
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        let read_position_usecase = Arc::new(ReadPositionUseCase::new(
            store.clone(),
            store.clone(),
            clock.clone(),
            config.mention_aliases.clone(),
        ));

        Self {
            connect_participant_usecase: Arc::new(ConnectParticipantUseCase::new(
                store.clone(),
                store.clone(),
                read_position_usecase.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            disconnect_participant_usecase: Arc::new(DisconnectParticipantUseCase::new(
                message_pusher.clone(),
            )),
            send_message_usecase: Arc::new(SendMessageUseCase::new(
                store.clone(),
                store.clone(),
                views.clone(),
                message_pusher.clone(),
                notifications,
                clock.clone(),
            )),
            edit_message_usecase: Arc::new(EditMessageUseCase::new(
                store.clone(),
                store.clone(),
                views.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            delete_message_usecase: Arc::new(DeleteMessageUseCase::new(
                store.clone(),
                store.clone(),
                views.clone(),
                message_pusher.clone(),
            )),
            pin_message_usecase: Arc::new(PinMessageUseCase::new(
                store.clone(),
                views.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            forward_message_usecase: Arc::new(ForwardMessageUseCase::new(
                store.clone(),
                store.clone(),
                views.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            react_to_message_usecase: Arc::new(ReactToMessageUseCase::new(
                store.clone(),
                views.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            fetch_messages_usecase: Arc::new(FetchMessagesUseCase::new(
                store.clone(),
                views,
                config.page_size,
            )),
            read_position_usecase,
            presence_usecase: Arc::new(PresenceUseCase::new(message_pusher.clone())),
            clear_history_usecase: Arc::new(ClearHistoryUseCase::new(
                store.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            mute_room_usecase: Arc::new(MuteRoomUseCase::new(
                store.clone(),
                message_pusher.clone(),
                clock,
            )),
            get_room_detail_usecase: Arc::new(GetRoomDetailUseCase::new(
                store,
                message_pusher.clone(),
            )),
            message_pusher,
            heartbeat: config.heartbeat,
        }
    }
}
