#![warn(missing_docs)]

//! relayfs selection subsystem: score-based choice of a storage node or a
//! local storage volume through ordered, reloadable filter chains.

pub mod candidate;
pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod filters;
pub mod glob;
pub mod node;
pub mod registry;
pub mod scoreboard;
pub mod units;
pub mod volume;

pub use candidate::{Candidate, Direction, LiveStatus, Node, Volume};
pub use chain::FilterChain;
pub use config::{ChainConfig, FilterProps};
pub use engine::{ChainSlot, SelectionEngine};
pub use error::{SelectError, SelectResult};
pub use filter::{Filter, SelectionContext};
pub use node::{ChainKind, NodeChains, NodeSelection};
pub use registry::{FilterFactory, FilterRegistry};
pub use scoreboard::{Score, ScoreBoard};
pub use volume::{VolumeSelection, VOLUME_CHAIN_FILE};
