//! Ember board node binary.
//!
//! Opens the RocksDB-backed board, rebuilds it from storage, and serves the
//! JSON-RPC interface until interrupted.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use ember_core::constants::{DEFAULT_RPC_PORT, HALF_LIFE_SECS};
use ember_node_lib::{start_rpc_server, Node, NodeConfig};
use tracing::{error, info};

/// Ember board node.
#[derive(Parser, Debug)]
#[command(
    name = "ember-node",
    version,
    about = "Ember bid-ranked message board with RocksDB storage and JSON-RPC server"
)]
struct Args {
    /// Data directory for board storage
    #[arg(long, default_value = None)]
    data_dir: Option<PathBuf>,

    /// RPC server bind address
    #[arg(long, default_value = "127.0.0.1")]
    rpc_bind: String,

    /// RPC server port
    #[arg(long, default_value_t = DEFAULT_RPC_PORT)]
    rpc_port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Seconds per bid halving.
    ///
    /// Development boards shorten this to watch decay happen; must be non-zero.
    #[arg(long, default_value_t = HALF_LIFE_SECS)]
    half_life_secs: u64,
}

impl Args {
    /// Convert CLI args into a NodeConfig.
    fn into_config(self) -> (NodeConfig, String) {
        let default_data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ember");

        let config = NodeConfig {
            data_dir: self.data_dir.unwrap_or(default_data_dir),
            rpc_bind: self.rpc_bind,
            rpc_port: self.rpc_port,
            log_level: self.log_level,
            half_life_secs: self.half_life_secs,
        };

        (config, self.log_format)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let (config, log_format) = args.into_config();

    init_logging(&config.log_level, &log_format);

    info!("Ember Board Node v{}", env!("CARGO_PKG_VERSION"));
    info!("data_dir: {:?}", config.data_dir);
    info!("rpc_addr: {}", config.rpc_addr());
    info!("half_life_secs: {}", config.half_life_secs);

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        error!("failed to create data_dir: {}", e);
        process::exit(1);
    }

    let node = match Node::open(config.clone()) {
        Ok(n) => n,
        Err(e) => {
            error!("failed to open board: {}", e);
            process::exit(1);
        }
    };

    info!(
        count = node.count(),
        minimum_bid = %node.minimum_qualifying_bid(),
        "board ready"
    );

    let rpc_handle = match start_rpc_server(&config.rpc_addr(), node.clone()).await {
        Ok(handle) => {
            info!("RPC server listening on {}", config.rpc_addr());
            handle
        }
        Err(e) => {
            error!("failed to start RPC server: {}", e);
            process::exit(1);
        }
    };

    info!("Ember node running (Ctrl+C to stop)");

    tokio::select! {
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => info!("received Ctrl+C, shutting down..."),
            Err(e) => error!("failed to listen for Ctrl+C: {}", e),
        },
        _ = rpc_handle.clone().stopped() => {
            info!("RPC server exited");
        }
    }

    rpc_handle.stop().ok();
    info!("RPC server stopped");
    info!("Ember node shutdown complete");
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output (suitable for log
/// aggregation pipelines). Any other value defaults to human-readable text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
