// Application state module
// Shared, read-mostly state handed to every request

use chrono::{DateTime, Utc};

use super::types::Config;
use crate::daemon::changes::ChangeRegistry;

/// Application state
pub struct AppState {
    pub config: Config,
    pub start_time: DateTime<Utc>,
    pub changes: ChangeRegistry,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            start_time: Utc::now(),
            changes: ChangeRegistry::new(),
        }
    }
}
