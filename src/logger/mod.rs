//! Logger module
//!
//! Provides logging utilities for the daemon including:
//! - Daemon lifecycle logging
//! - Access logging with multiple formats
//! - Leveled error, warning and debug logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::{Config, LoggingConfig};
use std::net::SocketAddr;
use std::str::FromStr;

/// Log severity, ordered from most to least severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" | "trace" => Ok(Self::Debug),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Initialize the logger with configuration
///
/// Should be called once at application startup, after `Config::validate`
/// has accepted the level.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    let level = config.level.parse().unwrap_or(Level::Info);
    writer::init(
        level,
        config.access_log_file.as_deref(),
        config.error_log_file.as_deref(),
    )
}

fn enabled(level: Level) -> bool {
    writer::get().map_or(level <= Level::Info, |w| level <= w.level())
}

fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

pub fn log_server_start(socket_path: &str, http_addr: Option<&SocketAddr>, config: &Config) {
    write_info("======================================");
    write_info(&format!("controld {} started", env!("CARGO_PKG_VERSION")));
    write_info(&format!("Control socket: {socket_path}"));
    if let Some(addr) = http_addr {
        write_info(&format!("HTTP listener: http://{addr}"));
    }
    write_info(&format!("Files directory: {}", config.daemon.files_dir));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.daemon.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    if let Some(ref notice) = config.daemon.maintenance {
        write_info(&format!("Maintenance notice: {notice}"));
    }
    write_info("======================================\n");
}

pub fn log_shutdown(socket_path: &str) {
    write_info(&format!("[Shutdown] Closing control socket {socket_path}"));
}

pub fn log_connection_accepted(peer: &str) {
    log_debug(&format!("[Connection] Accepted from: {peer}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    if enabled(Level::Warn) {
        write_error(&format!("[WARN] {message}"));
    }
}

pub fn log_debug(message: &str) {
    if enabled(Level::Debug) {
        write_info(&format!("[DEBUG] {message}"));
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    if enabled(Level::Info) {
        write_access(&entry.format(format));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing_and_order() {
        assert_eq!("WARNING".parse::<Level>(), Ok(Level::Warn));
        assert_eq!("debug".parse::<Level>(), Ok(Level::Debug));
        assert!("loud".parse::<Level>().is_err());
        assert!(Level::Error < Level::Info);
        assert!(Level::Debug > Level::Warn);
    }
}
