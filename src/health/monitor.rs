//! Periodic health check loop.
//!
//! # Responsibilities
//! - Run a health check round on a fixed interval
//! - Stop when the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::load_balancer::ConnPool;

pub struct HealthMonitor {
    pool: Arc<ConnPool>,
    interval: Duration,
    timeout: Duration,
}

impl HealthMonitor {
    pub fn new(pool: Arc<ConnPool>, config: &HealthCheckConfig) -> Self {
        Self {
            pool,
            interval: Duration::from_secs(config.interval_secs),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            timeout_secs = self.timeout.as_secs(),
            "Health monitor starting"
        );

        // First round one full interval after startup.
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::info!("Starting health check...");
                    self.pool.health_check(self.timeout).await;
                    tracing::info!("Health check completed.");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
