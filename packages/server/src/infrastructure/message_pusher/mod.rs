//! メッセージ送信（通知）の実装
//!
//! ## 実装
//!
//! - `websocket`: ルームごとのブロードキャストグループを持つ WebSocket 実装

pub mod websocket;

pub use websocket::WebSocketMessagePusher;
