//! Periodic load snapshot.
//!
//! Logs every backend's in-flight count and liveness on a fixed interval and
//! mirrors them into gauges.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::LoadReportConfig;
use crate::load_balancer::ConnPool;
use crate::observability::metrics;

pub struct LoadReporter {
    pool: Arc<ConnPool>,
    interval: Duration,
}

impl LoadReporter {
    pub fn new(pool: Arc<ConnPool>, config: &LoadReportConfig) -> Self {
        Self {
            pool,
            interval: Duration::from_secs(config.interval_secs),
        }
    }

    /// Log one snapshot of every backend.
    pub fn report(&self) {
        tracing::info!("Connection's load:");
        for snapshot in self.pool.load_statistics() {
            tracing::info!(
                backend = %snapshot.address,
                load = snapshot.load,
                alive = snapshot.alive,
                "Load"
            );
            metrics::record_backend_load(&snapshot.address, snapshot.load);
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.report(),
                _ = shutdown.recv() => {
                    tracing::debug!("Load reporter received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
