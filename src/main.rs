use std::sync::Arc;

use controld::config::{self, AppState};
use controld::daemon::server;
use controld::error::{DaemonError, Result};
use controld::logger;

fn main() -> Result<()> {
    // First argument overrides the config file path
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg.logging).map_err(DaemonError::Logger)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.daemon.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    let state = Arc::new(AppState::new(cfg));
    runtime.block_on(server::run(state))
}
