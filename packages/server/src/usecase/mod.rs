//! UseCase 層
//!
//! 各ユースケースは Domain 層の trait（Repository / MessagePusher / NotificationSink）
//! にのみ依存し、`Arc<dyn Trait>` として注入されます。

pub mod clear_history;
pub mod connect_participant;
pub mod delete_message;
pub mod disconnect_participant;
pub mod edit_message;
pub mod error;
pub mod fetch_messages;
pub mod forward_message;
pub mod get_room_detail;
pub mod message_view;
pub mod mute_room;
pub mod pin_message;
pub mod presence;
pub mod react_to_message;
pub mod read_position;
pub mod send_message;

#[cfg(test)]
pub(crate) mod test_support;

pub use clear_history::ClearHistoryUseCase;
pub use connect_participant::ConnectParticipantUseCase;
pub use delete_message::DeleteMessageUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use edit_message::EditMessageUseCase;
pub use error::{ChatError, ConnectError};
pub use fetch_messages::{FetchMessagesUseCase, MessagePage};
pub use forward_message::ForwardMessageUseCase;
pub use get_room_detail::{GetRoomDetailUseCase, RoomDetail};
pub use message_view::MessageViewBuilder;
pub use mute_room::MuteRoomUseCase;
pub use pin_message::PinMessageUseCase;
pub use presence::PresenceUseCase;
pub use react_to_message::ReactToMessageUseCase;
pub use read_position::{ReadMark, ReadPositionUseCase};
pub use send_message::SendMessageUseCase;
