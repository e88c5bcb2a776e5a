#![warn(missing_docs)]

//! relayfs daemon: configuration, a cluster of local volume directories,
//! and the runtime that drives the job scheduler.

pub mod cli;
pub mod config;
pub mod daemon;
pub mod disk;
pub mod local;
pub mod logging;

pub use config::{DaemonConfig, NodeConfig, SelectionConfig};
pub use daemon::{ChainSummary, Daemon, Placement};
pub use local::LocalCluster;
pub use logging::LogFormat;
