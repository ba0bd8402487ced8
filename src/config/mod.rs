//! Configuration module - environment variable parsing

use std::env;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Port for the game WebSocket listener
    pub game_ws_port: u16,
    /// Port for the signaling WebSocket listener
    pub signaling_port: u16,
    /// Port for the HTTP API listener
    pub api_port: u16,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Allowed client origin(s) for CORS, comma-separated
    pub client_origin: String,
    /// Game WebSocket URL handed to clients by the signaling channel
    pub public_game_ws_url: String,

    /// Registry base URL; advertisement is disabled when unset
    pub registry_url: Option<String>,
    /// Identity reported to the registry
    pub server_id: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let game_ws_port = env_port("GAME_WS_PORT", 4001)?;
        let signaling_port = env_port("SIGNALING_PORT", 4000)?;
        let api_port = env_port("API_PORT", 4002)?;

        let public_game_ws_url = env::var("PUBLIC_GAME_WS_URL")
            .unwrap_or_else(|_| format!("ws://localhost:{}/ws", game_ws_port));

        Ok(Self {
            game_ws_port,
            signaling_port,
            api_port,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origin: env::var("CLIENT_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            public_game_ws_url,
            registry_url: env::var("REGISTRY_URL").ok().filter(|s| !s.is_empty()),
            server_id: env::var("SERVER_ID").unwrap_or_else(|_| "shelter-1".to_string()),
        })
    }
}

fn env_port(name: &'static str, default: u16) -> Result<u16, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: expected a port number")]
    InvalidPort(&'static str),
}
