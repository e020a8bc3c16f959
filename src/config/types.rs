// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

pub const DEFAULT_SOCKET_PATH: &str = "/tmp/controld.socket";

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// Daemon configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DaemonConfig {
    /// Unix control socket the API is served on
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
    /// Optional `host:port` TCP listener serving the same API
    #[serde(default)]
    pub http_address: Option<String>,
    /// Tokio worker threads (CPU cores if unset)
    #[serde(default)]
    pub workers: Option<usize>,
    /// Root directory for `GET /v1/files/{name}`
    #[serde(default = "default_files_dir")]
    pub files_dir: String,
    /// Maintenance notice attached to every JSON response
    #[serde(default)]
    pub maintenance: Option<String>,
}

fn default_socket_path() -> String {
    DEFAULT_SOCKET_PATH.to_string()
}

fn default_files_dir() -> String {
    "files".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            http_address: None,
            workers: None,
            files_dir: default_files_dir(),
            maintenance: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

fn default_level() -> String {
    "info".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}

fn default_access_log_format() -> String {
    "combined".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            access_log: true,
            access_log_format: default_access_log_format(),
            access_log_file: None,
            error_log_file: None,
        }
    }
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    #[serde(default = "default_true")]
    pub keep_alive: bool,
    /// Upper bound for a single connection's lifetime, in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
    #[serde(default)]
    pub max_connections: Option<u64>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_connection_timeout() -> u64 {
    30
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            keep_alive: true,
            connection_timeout: default_connection_timeout(),
            max_connections: None,
        }
    }
}
