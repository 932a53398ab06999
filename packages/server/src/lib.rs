//! Kaiwa real-time chat messaging engine.
//!
//! Rooms, messages, reactions, read positions and presence served over
//! WebSocket, persisted in SQLite.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
