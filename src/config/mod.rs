//! Configuration module - environment variable parsing

mod game;

pub use game::GameConfig;

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Human readable or JSON log lines
    pub log_format: LogFormat,
    /// Allowed client origins for CORS ("*" allows any)
    pub client_origin: String,

    /// How long a room may sit empty before the reaper deletes it
    pub room_idle_grace: Duration,
    /// How often the reaper runs
    pub room_reap_interval: Duration,
    /// Player cap per room
    pub max_players_per_room: usize,
    /// Max inbound WebSocket messages per second per connection
    pub input_rate_limit: u32,

    /// Shared simulation tuning
    pub game: GameConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        };

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("text") | Err(_) => LogFormat::Text,
            Ok(_) => return Err(ConfigError::Invalid("LOG_FORMAT")),
        };

        let max_players_per_room: usize = parse_or("MAX_PLAYERS_PER_ROOM", 4)?;
        if max_players_per_room == 0 {
            return Err(ConfigError::Invalid("MAX_PLAYERS_PER_ROOM"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format,
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            room_idle_grace: Duration::from_secs(parse_or("ROOM_IDLE_GRACE_SECS", 300)?),
            room_reap_interval: Duration::from_secs(parse_or("ROOM_REAP_INTERVAL_SECS", 60)?),
            max_players_per_room,
            input_rate_limit: parse_or("INPUT_RATE_LIMIT", 120)?,

            game: GameConfig::default(),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            client_origin: "*".to_string(),
            room_idle_grace: Duration::from_secs(300),
            room_reap_interval: Duration::from_secs(60),
            max_players_per_room: 4,
            input_rate_limit: 120,
            game: GameConfig::default(),
        }
    }
}

/// Read an optional variable, keeping `default` when unset
fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
