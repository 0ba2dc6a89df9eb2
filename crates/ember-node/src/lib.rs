//! # ember-node: Board node: RocksDB, RPC, orchestration.
//!
//! Composes the Ember subsystems into a running board node:
//! - [`storage::RocksStore`]: persistent board state backed by RocksDB
//! - [`node::Node`]: board, storage, clock, and event fan-out
//! - [`rpc`]: JSON-RPC server for external access
//! - [`config::NodeConfig`]: node configuration

pub mod config;
pub mod node;
pub mod rpc;
pub mod storage;

pub use config::NodeConfig;
pub use node::{BoardInfo, Node};
pub use rpc::start_rpc_server;
pub use storage::RocksStore;
