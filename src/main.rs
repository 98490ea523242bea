//! vigil - self-healing supervisor for a child command.
//!
//! Spawns the given command and keeps it alive: health checks on a
//! backoff-driven cadence, a 60s deep check, and four escalating recovery
//! tiers whose outcomes are persisted so the supervisor starts tougher
//! after a rough history.
//!
//! # Usage
//!
//! ```bash
//! # Supervise a long-running process
//! vigil -- my-daemon --flag
//!
//! # Refine liveness with a shell probe (exit 0 = healthy)
//! vigil --probe-cmd 'curl -sf localhost:8080/health' -- my-daemon
//! ```
//!
//! # Environment Variables
//!
//! - `VIGIL_CONFIG`: path to a TOML tunables file
//! - `RUST_LOG`: logging level (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use vigil::adapters::{MeminfoGauge, ProcessCapability};
use vigil::{ActionInterface, SledStatStore, Supervisor, SupervisorConfig};

#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(about = "Self-healing supervisor for a child command")]
#[command(version)]
struct CliArgs {
    /// Path to the TOML config file (falls back to $VIGIL_CONFIG, then ./vigil.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the persistent stats database
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Shell command probing responsiveness; exit status 0 means healthy
    #[arg(long, value_name = "CMD")]
    probe_cmd: Option<String>,

    /// The command to supervise, after `--`
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    let config = SupervisorConfig::load(args.config.as_deref());
    for warning in config.validate() {
        warn!("Config: {warning}");
    }

    let store = Arc::new(
        SledStatStore::open(args.data_dir.join("vigil-stats"))
            .context("failed to open stats database")?,
    );

    let capability = Arc::new(ProcessCapability::new(args.command.clone(), args.probe_cmd)?);
    let gauge = Arc::new(MeminfoGauge::new());

    // Bring the capability up before supervision so the first probe is fair.
    capability.request_graceful_restart().await?;

    let supervisor = Supervisor::new(
        config,
        capability.clone(),
        capability,
        store,
        gauge,
    );
    supervisor.start().await;

    info!(command = %args.command.join(" "), "Supervising; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("Shutdown signal received");
    supervisor.stop().await;

    Ok(())
}
