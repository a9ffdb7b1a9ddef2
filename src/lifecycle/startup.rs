//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging and metrics
//! - Build the backend pool (fatal if the host list is empty or malformed)
//! - Start the server with its background loops
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::config::{load_config, ConfigError};
use crate::http::BalancerServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{logging, metrics};

/// Errors that stop the balancer from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options coming from the command line.
#[derive(Debug, Clone)]
pub struct StartupOptions {
    pub config_path: PathBuf,
    pub log_level: Option<String>,
}

/// Load config, start every subsystem and serve until a termination signal.
pub async fn run(options: StartupOptions) -> Result<(), StartupError> {
    let config = load_config(&options.config_path)?;

    let level = options
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    logging::init(level);

    tracing::info!(
        config = %options.config_path.display(),
        port = config.port,
        backends = config.hosts.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let server = BalancerServer::from_config(config)?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    server.start(shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
