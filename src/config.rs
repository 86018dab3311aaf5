//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub realtime: RealtimeConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend REST API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:8989".to_string()
}

fn default_request_timeout() -> u64 {
    50_000 // 50 seconds
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// Real-time alarm channel configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Explicit WebSocket endpoint; `/alarms` is appended
    pub ws_endpoint: Option<String>,

    /// API URL whose host is used for `/ws/alarms` when no endpoint is set
    pub api_url: Option<String>,

    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_ms: u64,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
}

fn default_reconnect_interval() -> u64 {
    5_000
}

fn default_max_reconnect_attempts() -> u32 {
    3
}

fn default_heartbeat_interval() -> u64 {
    30_000
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_endpoint: None,
            api_url: None,
            reconnect_interval_ms: default_reconnect_interval(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            heartbeat_interval_ms: default_heartbeat_interval(),
        }
    }
}

impl RealtimeConfig {
    /// Resolve the alarm channel URL.
    ///
    /// Order: explicit endpoint, then the host of `api_url`, then the origin
    /// of `fallback_base` (the REST base URL).
    pub fn alarm_url(&self, fallback_base: &str) -> String {
        if let Some(endpoint) = self.ws_endpoint.as_deref().filter(|e| !e.is_empty()) {
            return format!("{}/alarms", endpoint.trim_end_matches('/'));
        }

        if let Some(api_url) = self.api_url.as_deref().filter(|u| !u.is_empty()) {
            match websocket_origin(api_url) {
                Some(origin) => return format!("{}/ws/alarms", origin),
                None => {
                    tracing::warn!(api_url = %api_url, "Failed to parse API URL, falling back to base URL");
                }
            }
        }

        match websocket_origin(fallback_base) {
            Some(origin) => format!("{}/ws/alarms", origin),
            None => "ws://localhost/ws/alarms".to_string(),
        }
    }
}

/// Map an http(s) URL to the matching ws(s) origin
fn websocket_origin(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let scheme = if parsed.scheme() == "https" { "wss" } else { "ws" };
    let host = parsed.host_str()?;

    Some(match parsed.port() {
        Some(port) => format!("{}://{}:{}", scheme, host, port),
        None => format!("{}://{}", scheme, host),
    })
}

/// Credential and cache persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("warden").to_string_lossy().to_string())
        .unwrap_or_else(|| "./warden_data".to_string())
}

impl SessionConfig {
    /// Path of the persistent key/value file
    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("store.json")
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("warden").join("config.toml")),
            Some(PathBuf::from("./warden.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // API overrides
        if let Ok(url) = std::env::var("WARDEN_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(timeout) = std::env::var("WARDEN_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.api.request_timeout_ms = ms;
            }
        }

        // Realtime overrides
        if let Ok(endpoint) = std::env::var("WARDEN_WS_ENDPOINT") {
            self.realtime.ws_endpoint = Some(endpoint);
        }

        // Session overrides
        if let Ok(data_dir) = std::env::var("WARDEN_DATA_DIR") {
            self.session.data_dir = data_dir;
        }

        // Logging overrides
        if let Ok(level) = std::env::var("WARDEN_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("WARDEN_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Warden Configuration
#
# Environment variables override these settings:
# - WARDEN_API_URL
# - WARDEN_REQUEST_TIMEOUT_MS
# - WARDEN_WS_ENDPOINT
# - WARDEN_DATA_DIR
# - WARDEN_LOG_LEVEL
# - WARDEN_LOG_FORMAT

[api]
# Backend base URL
base_url = "http://localhost:8989"

# Request timeout in milliseconds
request_timeout_ms = 50000

[realtime]
# Explicit WebSocket endpoint ("/alarms" is appended)
# ws_endpoint = "wss://console.example.com/ws"

# API URL used to derive ws(s)://host/ws/alarms when no endpoint is set
# api_url = "https://console.example.com"

# Base reconnect delay; attempt k waits base * 2^(k-1)
reconnect_interval_ms = 5000

# Reconnect attempts before giving up
max_reconnect_attempts = 3

# Keep-alive ping interval
heartbeat_interval_ms = 30000

[session]
# Directory for persisted tokens and dictionary cache
# (defaults to the platform data directory, e.g. ~/.local/share/warden)
# data_dir = "/var/lib/warden"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8989");
        assert_eq!(config.api.request_timeout(), Duration::from_secs(50));
        assert_eq!(config.realtime.max_reconnect_attempts, 3);
        assert_eq!(config.realtime.reconnect_interval_ms, 5000);
        assert_eq!(config.realtime.heartbeat_interval_ms, 30000);
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8989");
        assert_eq!(config.logging.format, "pretty");
        assert!(config.realtime.ws_endpoint.is_none());
        assert_eq!(config.session.data_dir, default_data_dir());
        assert!(!config.session.data_dir.starts_with('~'));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::parse("[realtime]\nmax_reconnect_attempts = 5\n").unwrap();
        assert_eq!(config.realtime.max_reconnect_attempts, 5);
        assert_eq!(config.realtime.heartbeat_interval_ms, 30000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_alarm_url_prefers_endpoint() {
        let realtime = RealtimeConfig {
            ws_endpoint: Some("wss://push.example.com/ws/".to_string()),
            api_url: Some("https://api.example.com".to_string()),
            ..RealtimeConfig::default()
        };
        assert_eq!(
            realtime.alarm_url("http://localhost:8989"),
            "wss://push.example.com/ws/alarms"
        );
    }

    #[test]
    fn test_alarm_url_from_api_url() {
        let realtime = RealtimeConfig {
            api_url: Some("https://api.example.com/api/v1".to_string()),
            ..RealtimeConfig::default()
        };
        assert_eq!(
            realtime.alarm_url("http://localhost:8989"),
            "wss://api.example.com/ws/alarms"
        );
    }

    #[test]
    fn test_alarm_url_falls_back_to_base() {
        let realtime = RealtimeConfig {
            api_url: Some("not a url".to_string()),
            ..RealtimeConfig::default()
        };
        assert_eq!(
            realtime.alarm_url("http://localhost:8989"),
            "ws://localhost:8989/ws/alarms"
        );
    }
}
