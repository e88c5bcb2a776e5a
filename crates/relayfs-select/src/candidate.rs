//! Candidates scored during a selection call: storage nodes and the storage
//! volumes local to one node.
//!
//! Status is supplied by the caller and treated as read-only; nothing in this
//! crate mutates it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Direction of a transfer, seen from the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// The candidate receives data (client upload, job destination).
    Receiving,
    /// The candidate sends data (client download, job source).
    Sending,
}

/// Live status snapshot of a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStatus {
    /// Free bytes.
    pub available_bytes: u64,
    /// Capacity in bytes.
    pub total_bytes: u64,
    /// Current inbound throughput, bytes per second.
    pub throughput_in_bps: u64,
    /// Current outbound throughput, bytes per second.
    pub throughput_out_bps: u64,
    /// Transfers currently being received.
    pub transfers_in: u32,
    /// Transfers currently being sent.
    pub transfers_out: u32,
    /// Milliseconds since the epoch of the last transfer activity, 0 if none.
    pub last_activity_ms: u64,
    /// Whether the candidate answered its last status poll.
    pub reachable: bool,
}

impl LiveStatus {
    /// Status of an idle, reachable candidate.
    pub fn idle(available_bytes: u64, total_bytes: u64) -> Self {
        Self {
            available_bytes,
            total_bytes,
            reachable: true,
            ..Self::default()
        }
    }

    /// Throughput in the given direction.
    pub fn throughput(&self, direction: Direction) -> u64 {
        match direction {
            Direction::Receiving => self.throughput_in_bps,
            Direction::Sending => self.throughput_out_bps,
        }
    }

    /// Combined throughput in both directions.
    pub fn total_throughput(&self) -> u64 {
        self.throughput_in_bps.saturating_add(self.throughput_out_bps)
    }

    /// Active transfer count in the given direction.
    pub fn transfers(&self, direction: Direction) -> u32 {
        match direction {
            Direction::Receiving => self.transfers_in,
            Direction::Sending => self.transfers_out,
        }
    }
}

/// Anything a ScoreBoard can rank.
pub trait Candidate: Clone + Send + Sync + 'static {
    /// Stable identifier, unique within one candidate set.
    fn name(&self) -> &str;

    /// Live status as last reported.
    fn status(&self) -> &LiveStatus;
}

/// A storage node managed by the master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Node name as used in configuration.
    pub name: String,
    /// Live status.
    pub status: LiveStatus,
}

impl Node {
    /// Create a node with the given status.
    pub fn new(name: impl Into<String>, status: LiveStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }

    /// Whether the node can currently take part in a transfer.
    pub fn is_available(&self) -> bool {
        self.status.reachable
    }
}

impl Candidate for Node {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> &LiveStatus {
        &self.status
    }
}

/// A storage root on a single node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// Volume name as used in `volume.conf` assignments.
    pub name: String,
    /// Root directory of the volume.
    pub root: PathBuf,
    /// Live status.
    pub status: LiveStatus,
}

impl Volume {
    /// Create a volume with the given status.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>, status: LiveStatus) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            status,
        }
    }
}

impl Candidate for Volume {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> &LiveStatus {
        &self.status
    }
}
