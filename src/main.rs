//! Least-connections HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                 LOAD BALANCER                  │
//!   Client Request     │  ┌────────┐    ┌──────────┐    ┌────────────┐  │
//!   ───────────────────┼─▶│  http  │───▶│   pool   │───▶│  dispatch  │──┼───▶ Backend
//!                      │  │ server │    │least-conn│    │retry/fail- │  │     (1 of N)
//!   Client Response    │  │        │◀───│          │◀───│   over     │◀─┼────
//!   ◀──────────────────┼──│        │    └────▲─────┘    └────────────┘  │
//!                      │  └────────┘         │                          │
//!                      │            ┌────────┴─────────┐                │
//!                      │            │ health (45s TCP) │                │
//!                      │            │ load report (10s)│                │
//!                      │            └──────────────────┘                │
//!                      └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use least_conn_lb::lifecycle::startup::{self, StartupOptions};

#[derive(Parser)]
#[command(name = "least-conn-lb")]
#[command(about = "Least-connections HTTP load balancer", long_about = None)]
struct Cli {
    /// Path to the configuration file (.json or .toml).
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Log filter, overrides the configured level.
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    startup::run(StartupOptions {
        config_path: cli.config,
        log_level: cli.log_level,
    })
    .await?;

    Ok(())
}
