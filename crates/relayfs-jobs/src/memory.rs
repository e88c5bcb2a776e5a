//! In-memory cluster implementing every collaborator trait, for tests and
//! dry runs. Transfers complete instantly unless gated.

use crate::collab::{FileIndex, NodeRoster, TransferAgent};
use crate::error::{JobError, JobResult};
use crate::transfer::{TransferOutcome, TransferProgress, TransferRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use relayfs_select::{LiveStatus, Node};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
struct MemFile {
    size: u64,
    holders: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<String, Node>,
    files: BTreeMap<String, MemFile>,
    transfers: Vec<TransferRequest>,
    deletions: Vec<(String, String)>,
    failures: VecDeque<JobError>,
    corrupting: HashSet<String>,
    /// Unindexed copies: (node, path) to whether the bytes match.
    strays: BTreeMap<(String, String), bool>,
    gate: Option<Arc<Notify>>,
}

/// Nodes and files held in memory.
#[derive(Debug, Default)]
pub struct MemoryCluster {
    state: Mutex<State>,
}

impl MemoryCluster {
    /// Empty cluster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reachable node with `available` free bytes.
    pub fn add_node(&self, name: &str, available: u64) {
        self.state.lock().nodes.insert(
            name.to_string(),
            Node::new(name, LiveStatus::idle(available, available.max(1) * 2)),
        );
    }

    /// Flip a node's reachability.
    pub fn set_reachable(&self, name: &str, reachable: bool) {
        if let Some(node) = self.state.lock().nodes.get_mut(name) {
            node.status.reachable = reachable;
        }
    }

    /// Add a file held by `holders`.
    pub fn add_file(&self, path: &str, size: u64, holders: &[&str]) {
        self.state.lock().files.insert(
            path.to_string(),
            MemFile {
                size,
                holders: holders.iter().map(|h| h.to_string()).collect(),
            },
        );
    }

    /// Delete a file from the index entirely.
    pub fn remove_file(&self, path: &str) {
        self.state.lock().files.remove(path);
    }

    /// Current holders of `path`, sorted.
    pub fn holders(&self, path: &str) -> Vec<String> {
        self.state
            .lock()
            .files
            .get(path)
            .map(|f| f.holders.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Leave a copy of `path` on `node` that the index does not know about.
    /// A non-`matching` copy has different bytes from the indexed file.
    pub fn add_stray_copy(&self, node: &str, path: &str, matching: bool) {
        self.state
            .lock()
            .strays
            .insert((node.to_string(), path.to_string()), matching);
    }

    /// Make the next transfer fail with `error`.
    pub fn fail_next_transfer(&self, error: JobError) {
        self.state.lock().failures.push_back(error);
    }

    /// Copies written to `node` come out with a different checksum.
    pub fn corrupt_writes_on(&self, node: &str) {
        self.state.lock().corrupting.insert(node.to_string());
    }

    /// Hold every following transfer until the returned handle is notified
    /// or the leg is cancelled.
    pub fn gate_transfers(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().gate = Some(Arc::clone(&gate));
        gate
    }

    /// Every transfer request seen, in order.
    pub fn transfers(&self) -> Vec<TransferRequest> {
        self.state.lock().transfers.clone()
    }

    /// Every `(node, path)` deletion seen, in order.
    pub fn deletions(&self) -> Vec<(String, String)> {
        self.state.lock().deletions.clone()
    }

    fn gone(path: &str) -> JobError {
        JobError::FileGone {
            path: path.to_string(),
        }
    }

    fn checksum(path: &str) -> u32 {
        path.bytes()
            .fold(0x811c_9dc5u32, |h, b| (h ^ b as u32).wrapping_mul(0x0100_0193))
    }
}

#[async_trait]
impl NodeRoster for MemoryCluster {
    async fn available_nodes(&self) -> JobResult<Vec<Node>> {
        Ok(self
            .state
            .lock()
            .nodes
            .values()
            .filter(|n| n.is_available())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FileIndex for MemoryCluster {
    async fn holding_nodes(&self, path: &str) -> JobResult<Vec<Node>> {
        let state = self.state.lock();
        let file = state.files.get(path).ok_or_else(|| Self::gone(path))?;
        Ok(file
            .holders
            .iter()
            .map(|h| {
                state
                    .nodes
                    .get(h)
                    .cloned()
                    .unwrap_or_else(|| Node::new(h.as_str(), LiveStatus::default()))
            })
            .collect())
    }

    async fn size(&self, path: &str) -> JobResult<u64> {
        let state = self.state.lock();
        state
            .files
            .get(path)
            .map(|f| f.size)
            .ok_or_else(|| Self::gone(path))
    }

    async fn add_holder(&self, path: &str, node: &str) -> JobResult<()> {
        let mut state = self.state.lock();
        let file = state.files.get_mut(path).ok_or_else(|| Self::gone(path))?;
        file.holders.insert(node.to_string());
        state.strays.remove(&(node.to_string(), path.to_string()));
        Ok(())
    }

    async fn remove_holder(&self, path: &str, node: &str) -> JobResult<()> {
        let mut state = self.state.lock();
        let file = state.files.get_mut(path).ok_or_else(|| Self::gone(path))?;
        file.holders.remove(node);
        Ok(())
    }
}

#[async_trait]
impl TransferAgent for MemoryCluster {
    async fn transfer(
        &self,
        request: &TransferRequest,
        progress: &TransferProgress,
        cancel: &CancellationToken,
    ) -> JobResult<TransferOutcome> {
        let (gate, failure, size, corrupt, stray) = {
            let mut state = self.state.lock();
            state.transfers.push(request.clone());
            let failure = state.failures.pop_front();
            let size = state
                .files
                .get(&request.path)
                .filter(|f| f.holders.contains(&request.source))
                .map(|f| f.size);
            let corrupt = state.corrupting.contains(&request.destination);
            let stray = state
                .strays
                .get(&(request.destination.clone(), request.path.clone()))
                .copied();
            (state.gate.clone(), failure, size, corrupt, stray)
        };

        if let Some(gate) = gate {
            tokio::select! {
                _ = cancel.cancelled() => return Err(JobError::Cancelled),
                _ = gate.notified() => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        if let Some(e) = failure {
            return Err(e);
        }
        let size = size.ok_or_else(|| Self::gone(&request.path))?;
        let crc = Self::checksum(&request.path);
        if let Some(matching) = stray {
            return Ok(TransferOutcome {
                bytes: 0,
                elapsed: Duration::from_millis(1),
                source_checksum: Some(crc),
                destination_checksum: Some(if matching { crc } else { !crc }),
                existing: true,
            });
        }
        progress.advance(size);

        let (source_checksum, destination_checksum) = if request.checksum {
            (Some(crc), Some(if corrupt { !crc } else { crc }))
        } else {
            (None, None)
        };
        Ok(TransferOutcome {
            bytes: size,
            elapsed: Duration::from_millis(1),
            source_checksum,
            destination_checksum,
            existing: false,
        })
    }

    async fn delete(&self, node: &str, path: &str) -> JobResult<()> {
        let mut state = self.state.lock();
        state.deletions.push((node.to_string(), path.to_string()));
        state.strays.remove(&(node.to_string(), path.to_string()));
        if let Some(file) = state.files.get_mut(path) {
            file.holders.remove(node);
        }
        Ok(())
    }
}
