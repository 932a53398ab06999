//! WebSocket chat server implementation.

mod handler;
mod server;
pub mod session;
mod signal;
pub mod state;

pub use server::Server;
pub use session::{ChatSession, SessionPhase};
pub use state::AppState;
