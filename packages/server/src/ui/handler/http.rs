//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{infrastructure::dto::http::RoomDetailDto, ui::state::AppState};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get room detail by name
///
/// Looking a room up never creates it; unknown or invalid names are 404.
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room): Path<String>,
) -> Result<Json<RoomDetailDto>, StatusCode> {
    match state.get_room_detail_usecase.execute(&room).await {
        // Domain Model から DTO への変換
        Ok(Some(detail)) => Ok(Json(RoomDetailDto::new(&detail.room, detail.online_users))),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to load room '{}': {}", room, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
