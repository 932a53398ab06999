//! Infrastructure layer: persistence, live delivery and wire formats.

pub mod dto;
pub mod message_pusher;
pub mod notification;
pub mod repository;
