//! Domain layer: entities, value objects, policies and the ports the
//! outer layers implement.

pub mod entity;
pub mod error;
pub mod event;
pub mod forward;
pub mod mention;
pub mod notification;
pub mod policy;
pub mod pusher;
pub mod repository;
pub mod value_object;

pub use entity::*;
pub use error::{MessagePushError, NotificationError, RepositoryError, ValueError};
pub use event::ChatEvent;
pub use notification::NotificationSink;
pub use pusher::{MessagePusher, PusherChannel};
pub use repository::{
    MessageRepository, PositionRepository, ReactionRepository, RoomRepository, UserDirectory,
};
pub use value_object::*;

#[cfg(test)]
pub use notification::MockNotificationSink;
#[cfg(test)]
pub use repository::MockMessageRepository;
#[cfg(test)]
pub use pusher::MockMessagePusher;
