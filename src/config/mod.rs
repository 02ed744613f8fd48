use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

/// Environment variable overriding the listening port
pub const PORT_ENV: &str = "PORT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid server address '{0}'")]
    InvalidAddr(String),
    #[error("invalid port '{0}'")]
    InvalidPort(String),
    #[error("request_timeout_ms must be greater than zero")]
    ZeroTimeout,
}

/// Log configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LogConfig {
    /// Log file path, if not set, logs will be printed to stdout
    pub file: Option<String>,
    /// Log level, default is "info"
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: default_log_level(),
        }
    }
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// HTTP listening address
    #[serde(default = "default_server_addr")]
    pub server_addr: String,

    /// Upper bound on reading a request and writing its response
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Log configuration
    #[serde(default)]
    pub log: LogConfig,
}

fn default_server_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            request_timeout_ms: default_request_timeout_ms(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;

        let config: Config = toml::from_str(&config_str).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server_addr
            .parse()
            .map_err(|_| ConfigError::InvalidAddr(self.server_addr.clone()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Replace the port of `server_addr`, keeping its host
    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        let mut addr = self.socket_addr()?;
        addr.set_port(port);
        self.server_addr = addr.to_string();
        Ok(())
    }

    /// Apply the PORT environment value, if one is given
    pub fn apply_port_env(&mut self, value: Option<String>) -> Result<(), ConfigError> {
        match value {
            Some(raw) if !raw.is_empty() => {
                let port = raw
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPort(raw.clone()))?;
                self.set_port(port)
            }
            _ => Ok(()),
        }
    }
}
