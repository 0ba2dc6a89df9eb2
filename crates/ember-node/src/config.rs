//! Node configuration for the Ember board node.
//!
//! Provides [`NodeConfig`] with defaults for data directory, RPC binding,
//! logging, and the decay half-life.

use std::path::PathBuf;

use ember_core::constants::{DEFAULT_RPC_PORT, HALF_LIFE_SECS};

/// Configuration for a board node instance.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Root directory for all persistent data.
    pub data_dir: PathBuf,
    /// IP address for the JSON-RPC server to bind to.
    pub rpc_bind: String,
    /// Port for the JSON-RPC server.
    pub rpc_port: u16,
    /// Log level filter string (e.g. "info", "debug", "ember_board=trace").
    pub log_level: String,
    /// Seconds per bid halving. Only development boards change this.
    pub half_life_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ember");

        Self {
            data_dir,
            rpc_bind: "127.0.0.1".to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            log_level: "info".to_string(),
            half_life_secs: HALF_LIFE_SECS,
        }
    }
}

impl NodeConfig {
    /// Path to the RocksDB board data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("boarddata")
    }

    /// Socket address string for the RPC server.
    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.rpc_bind, self.rpc_port)
    }
}
