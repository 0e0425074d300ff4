//! Configuration management for Huddle
//!
//! Defaults carry the protocol's standard constants; overrides come from
//! a TOML file or `HUDDLE_*` environment variables, and everything is
//! validated before use.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Port the server listens on and clients dial by default.
pub const DEFAULT_PORT: u16 = 7450;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Group store configuration
    pub groups: GroupConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Maximum concurrently served connections (admission control)
    pub max_connections: usize,

    /// Inactivity timeout: a connection with no inbound request for this
    /// long is closed
    #[serde(with = "humantime_serde")]
    pub inactivity_timeout: Duration,

    /// Graceful shutdown grace period before workers are cancelled
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

/// Group store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Message cache capacity per group
    pub message_cache_size: usize,

    /// Maximum messages returned by an all-topics query
    pub max_messages_returned: usize,

    /// Group created at startup
    pub default_group: String,

    /// Password of the startup group
    pub default_password: String,

    /// Topic every session starts in
    pub default_topic: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            groups: GroupConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            max_connections: 1000,
            inactivity_timeout: Duration::from_secs(300),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            message_cache_size: 500,
            max_messages_returned: 100,
            default_group: "default".to_string(),
            default_password: "default".to_string(),
            default_topic: "default".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables follow the pattern HUDDLE_<SECTION>_<KEY>.
    /// Example: HUDDLE_SERVER_BIND_ADDRESS=0.0.0.0:7450
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Server config
        if let Ok(addr) = env::var("HUDDLE_SERVER_BIND_ADDRESS") {
            config.server.bind_address = addr
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid bind address: {}", e)))?;
        }
        if let Ok(max_conn) = env::var("HUDDLE_SERVER_MAX_CONNECTIONS") {
            config.server.max_connections = max_conn.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid max connections: {}", e))
            })?;
        }
        if let Ok(secs) = env::var("HUDDLE_SERVER_INACTIVITY_TIMEOUT_SECS") {
            config.server.inactivity_timeout = Duration::from_secs(secs.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid inactivity timeout: {}", e))
            })?);
        }
        if let Ok(secs) = env::var("HUDDLE_SERVER_SHUTDOWN_TIMEOUT_SECS") {
            config.server.shutdown_timeout = Duration::from_secs(secs.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid shutdown timeout: {}", e))
            })?);
        }

        // Group config
        if let Ok(size) = env::var("HUDDLE_GROUPS_MESSAGE_CACHE_SIZE") {
            config.groups.message_cache_size = size
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid cache size: {}", e)))?;
        }
        if let Ok(max) = env::var("HUDDLE_GROUPS_MAX_MESSAGES_RETURNED") {
            config.groups.max_messages_returned = max
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid output cap: {}", e)))?;
        }
        if let Ok(name) = env::var("HUDDLE_GROUPS_DEFAULT_GROUP") {
            config.groups.default_group = name;
        }
        if let Ok(password) = env::var("HUDDLE_GROUPS_DEFAULT_PASSWORD") {
            config.groups.default_password = password;
        }
        if let Ok(topic) = env::var("HUDDLE_GROUPS_DEFAULT_TOPIC") {
            config.groups.default_topic = topic;
        }

        // Logging config
        if let Ok(level) = env::var("HUDDLE_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = env::var("HUDDLE_LOG_JSON") {
            config.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid JSON flag: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_connections == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_connections must be greater than 0".to_string(),
            ));
        }

        if self.groups.message_cache_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "message_cache_size must be greater than 0".to_string(),
            ));
        }
        if self.groups.max_messages_returned == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_messages_returned must be greater than 0".to_string(),
            ));
        }
        if !crate::validate::is_valid_name(&self.groups.default_group) {
            return Err(ConfigError::ValidationFailed(
                "default_group is not a valid name".to_string(),
            ));
        }
        if !crate::validate::is_valid_name(&self.groups.default_password) {
            return Err(ConfigError::ValidationFailed(
                "default_password is not a valid name".to_string(),
            ));
        }
        if !crate::validate::is_valid_name(&self.groups.default_topic) {
            return Err(ConfigError::ValidationFailed(
                "default_topic is not a valid name".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}
