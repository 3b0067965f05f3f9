//! live-config daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   JSON-RPC caller
//!        │  POST /jsonrpc
//!        ▼
//!   ┌──────────┐    ┌────────────┐    ┌───────────────┐
//!   │   rpc    │───▶│ dispatcher │───▶│ ConfigService │
//!   │  server  │    └────────────┘    └───────┬───────┘
//!   └──────────┘                              │
//!            ┌──────────────┬─────────────────┼──────────────┐
//!            ▼              ▼                 ▼              ▼
//!      ┌──────────┐   ┌──────────┐     ┌────────────┐  ┌─────────────┐
//!      │ planner  │   │  reload  │     │   store    │  │ persistence │
//!      │ (update) │──▶│ (source) │────▶│ (sections) │  │ (ConfigDb)  │
//!      └──────────┘   └──────────┘     └────────────┘  └─────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use live_config::config::{load_config, ServiceConfig};
use live_config::lifecycle::startup;
use live_config::observability::logging;

#[derive(Parser)]
#[command(name = "live-config")]
#[command(about = "Runtime configuration store with hot reload", long_about = None)]
struct Args {
    /// Bootstrap config file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "live-config starting");
    tracing::info!(
        bind_address = %config.rpc.bind_address,
        default_tenant = %config.sections.default_tenant,
        backing_store = config.backing_store.kind.as_str(),
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
