//! Kaiwa chat server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kaiwa-server
//! cargo run --bin kaiwa-server -- --host 0.0.0.0 --port 3000 --database-url sqlite://kaiwa.db
//! ```

use std::sync::Arc;

use clap::Parser;
use kaiwa_server::{
    config::{Args, ChatConfig},
    infrastructure::{
        message_pusher::WebSocketMessagePusher, notification::TracingNotificationSink,
        repository::SqliteStore,
    },
    ui::{AppState, Server},
};
use kaiwa_shared::{logger::setup_logger, time::SystemClock};

const MAX_DB_CONNECTIONS: u32 = 5;

#[tokio::main]
async fn main() {
    let config = match ChatConfig::try_from(Args::parse()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    // Initialize dependencies in order:
    // 1. Store
    // 2. MessagePusher / NotificationSink / Clock
    // 3. AppState (UseCases)
    // 4. Server

    // 1. Open the SQLite store and apply the schema
    let store = match SqliteStore::connect(&config.database_url, MAX_DB_CONNECTIONS).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to open '{}': {}", config.database_url, e);
            std::process::exit(1);
        }
    };

    // 2. Outbound ports
    let message_pusher = Arc::new(WebSocketMessagePusher::new());
    let notifications = Arc::new(TracingNotificationSink::new());
    let clock = Arc::new(SystemClock);

    // 3. Wire the use cases
    let state = AppState::new(store, message_pusher, notifications, clock, &config);

    // 4. Run the server
    if let Err(e) = Server::new(state).run(&config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
