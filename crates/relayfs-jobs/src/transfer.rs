//! One node-to-node transfer leg: request, live progress and outcome.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// What to copy, from where to where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Virtual path of the file.
    pub path: String,
    /// Sending node.
    pub source: String,
    /// Receiving node.
    pub destination: String,
    /// Ask for an encrypted channel between the nodes.
    pub secure: bool,
    /// Ask both sides for a checksum.
    pub checksum: bool,
}

/// Progress of a running leg, updated by the transfer agent and read by
/// job listings without taking the queue lock.
#[derive(Debug, Default)]
pub struct TransferProgress {
    transferred: AtomicU64,
    total: AtomicU64,
    started: Mutex<Option<Instant>>,
}

impl TransferProgress {
    /// Fresh progress for a file of `total` bytes.
    pub fn new(total: u64) -> Self {
        Self {
            transferred: AtomicU64::new(0),
            total: AtomicU64::new(total),
            started: Mutex::new(None),
        }
    }

    /// Mark the start of the leg.
    pub fn start(&self) {
        *self.started.lock() = Some(Instant::now());
    }

    /// Record `bytes` more transferred.
    pub fn advance(&self, bytes: u64) {
        self.transferred.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Bytes transferred so far.
    pub fn transferred(&self) -> u64 {
        self.transferred.load(Ordering::Relaxed)
    }

    /// Expected size.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Time since [`start`](Self::start), zero before it.
    pub fn elapsed(&self) -> Duration {
        self.started
            .lock()
            .map(|t| t.elapsed())
            .unwrap_or_default()
    }

    /// Average speed in bytes per second.
    pub fn speed_bps(&self) -> u64 {
        let secs = self.elapsed().as_secs_f64();
        if secs <= 0.0 {
            return 0;
        }
        (self.transferred() as f64 / secs) as u64
    }
}

/// Result of a completed leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Bytes written at the destination.
    pub bytes: u64,
    /// Wall time of the leg.
    pub elapsed: Duration,
    /// CRC32 computed by the source, if it computed one.
    pub source_checksum: Option<u32>,
    /// CRC32 computed by the destination, if it computed one.
    pub destination_checksum: Option<u32>,
    /// The destination already held the file and nothing was written. Both
    /// checksums describe the copies as found.
    pub existing: bool,
}

impl TransferOutcome {
    /// Whether both sides produced checksums and they differ.
    pub fn checksum_mismatch(&self) -> bool {
        matches!(
            (self.source_checksum, self.destination_checksum),
            (Some(a), Some(b)) if a != b
        )
    }

    /// Bytes per second over the whole leg.
    pub fn speed_bps(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return self.bytes;
        }
        (self.bytes as f64 / secs) as u64
    }
}
