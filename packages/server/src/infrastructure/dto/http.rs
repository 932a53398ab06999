//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// Room detail returned by `GET /api/rooms/{room}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomDetailDto {
    pub name: String,
    pub kind: String,
    pub display_name: String,
    pub is_muted: bool,
    pub history_cleared: bool,
    /// RFC 3339
    pub created_at: String,
    pub online_users: usize,
}
