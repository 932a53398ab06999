//! Runtime configuration.
//!
//! Command-line flags (each with an environment fallback) are parsed with
//! `clap` and validated into a [`ChatConfig`].

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MIN_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Parser, Debug, Clone)]
#[command(name = "kaiwa-server")]
#[command(about = "Real-time chat engine over WebSocket", long_about = None)]
pub struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "KAIWA_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "KAIWA_PORT", default_value_t = 8080)]
    pub port: u16,

    /// SQLite database URL
    #[arg(long, env = "KAIWA_DATABASE_URL", default_value = "sqlite://kaiwa.db?mode=rwc")]
    pub database_url: String,

    /// Messages per history page (50..=100)
    #[arg(long, env = "KAIWA_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Seconds between transport pings
    #[arg(long, env = "KAIWA_HEARTBEAT_INTERVAL_SECS", default_value_t = 15)]
    pub heartbeat_interval_secs: u64,

    /// Seconds of silence before a connection is dropped
    #[arg(long, env = "KAIWA_HEARTBEAT_TIMEOUT_SECS", default_value_t = 45)]
    pub heartbeat_timeout_secs: u64,

    /// Words that notify everyone when mentioned (`@all`)
    #[arg(
        long = "mention-alias",
        env = "KAIWA_MENTION_ALIASES",
        value_delimiter = ',',
        default_values_t = [String::from("all"), String::from("everyone")]
    )]
    pub mention_aliases: Vec<String>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, env = "KAIWA_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("page size must be between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE} (got {0})")]
    PageSizeOutOfRange(u32),

    #[error("heartbeat timeout ({timeout_secs}s) must exceed the interval ({interval_secs}s)")]
    HeartbeatTimeout {
        interval_secs: u64,
        timeout_secs: u64,
    },

    #[error("invalid mention alias: '{0}'")]
    InvalidAlias(String),
}

/// Transport-level liveness settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            timeout: Duration::from_secs(45),
        }
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub page_size: u32,
    pub heartbeat: HeartbeatConfig,
    pub mention_aliases: Vec<String>,
    pub log_level: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: "sqlite://kaiwa.db?mode=rwc".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            heartbeat: HeartbeatConfig::default(),
            mention_aliases: vec!["all".to_string(), "everyone".to_string()],
            log_level: "info".to_string(),
        }
    }
}

impl ChatConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ConfigError::PageSizeOutOfRange(self.page_size));
        }
        if self.heartbeat.timeout <= self.heartbeat.interval {
            return Err(ConfigError::HeartbeatTimeout {
                interval_secs: self.heartbeat.interval.as_secs(),
                timeout_secs: self.heartbeat.timeout.as_secs(),
            });
        }
        if let Some(alias) = self
            .mention_aliases
            .iter()
            .find(|alias| alias.is_empty() || !alias.chars().all(|c| c.is_alphanumeric() || c == '_'))
        {
            return Err(ConfigError::InvalidAlias(alias.clone()));
        }
        Ok(self)
    }
}

impl TryFrom<Args> for ChatConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        ChatConfig {
            host: args.host,
            port: args.port,
            database_url: args.database_url,
            page_size: args.page_size,
            heartbeat: HeartbeatConfig {
                interval: Duration::from_secs(args.heartbeat_interval_secs),
                timeout: Duration::from_secs(args.heartbeat_timeout_secs),
            },
            mention_aliases: args
                .mention_aliases
                .into_iter()
                .map(|alias| alias.trim().to_string())
                .collect(),
            log_level: args.log_level,
        }
        .validate()
    }
}
