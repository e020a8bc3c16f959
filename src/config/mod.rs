// Configuration module entry point
// Loads daemon configuration and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

use crate::error::{DaemonError, Result};
use crate::logger::Level;

// Re-export public types
pub use state::AppState;
pub use types::{Config, DaemonConfig, LoggingConfig, PerformanceConfig, DEFAULT_SOCKET_PATH};

/// Config file looked up when no path is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "controld";

impl Config {
    /// Load configuration from specified file path (extension optional).
    /// A missing file is not an error: defaults and `CONTROLD__*` environment
    /// overrides still apply.
    pub fn load_from(config_path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("CONTROLD").separator("__"))
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.daemon.socket_path.trim().is_empty() {
            return Err(DaemonError::InvalidConfig(
                "daemon.socket_path must not be empty".to_string(),
            ));
        }
        self.get_http_addr()?;
        if self.daemon.workers == Some(0) {
            return Err(DaemonError::InvalidConfig(
                "daemon.workers must be greater than zero".to_string(),
            ));
        }
        self.logging
            .level
            .parse::<Level>()
            .map_err(|e| DaemonError::InvalidConfig(format!("logging.level: {e}")))?;
        if self.performance.connection_timeout == 0 {
            return Err(DaemonError::InvalidConfig(
                "performance.connection_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get_http_addr(&self) -> Result<Option<SocketAddr>> {
        self.daemon
            .http_address
            .as_deref()
            .map(|addr| {
                addr.parse().map_err(|e| {
                    DaemonError::InvalidConfig(format!("Invalid http_address '{addr}': {e}"))
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("/nonexistent/controld-test-config").unwrap();
        assert_eq!(cfg.daemon.files_dir, "files");
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert_eq!(cfg.performance.connection_timeout, 30);
        assert!(cfg.daemon.maintenance.is_none());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[daemon]\nsocket_path = \"/run/test.socket\"\nhttp_address = \"127.0.0.1:4000\"\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        let cfg = Config::load_from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.daemon.socket_path, "/run/test.socket");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(
            cfg.get_http_addr().unwrap(),
            Some("127.0.0.1:4000".parse().unwrap())
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.daemon.socket_path = "  ".to_string();
        assert!(matches!(cfg.validate(), Err(DaemonError::InvalidConfig(_))));

        let mut cfg = Config::default();
        cfg.daemon.http_address = Some("not-an-address".to_string());
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.performance.connection_timeout = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.daemon.workers = Some(0);
        assert!(matches!(cfg.validate(), Err(DaemonError::InvalidConfig(_))));

        let mut cfg = Config::default();
        cfg.logging.level = "loud".to_string();
        assert!(matches!(cfg.validate(), Err(DaemonError::InvalidConfig(_))));

        let mut cfg = Config::default();
        cfg.daemon.workers = Some(2);
        cfg.logging.level = "WARN".to_string();
        assert!(cfg.validate().is_ok());

        assert!(Config::default().validate().is_ok());
    }
}
