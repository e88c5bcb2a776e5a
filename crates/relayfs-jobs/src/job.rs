//! Replication jobs.

use crate::error::{JobError, JobResult};
use crate::transfer::TransferProgress;
use relayfs_select::Node;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Monotonic display index.
pub type JobIndex = u64;

/// Job lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Waiting for a tick to match it.
    Queued,
    /// A leg is running.
    Transferring,
    /// Replica target met. Terminal.
    Done,
    /// Removed by an operator or the file vanished. Terminal.
    Aborted,
}

impl JobState {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Aborted)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Queued => "QUEUED",
            JobState::Transferring => "TRANSFERRING",
            JobState::Done => "DONE",
            JobState::Aborted => "ABORTED",
        };
        f.write_str(s)
    }
}

/// A request to replicate one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Virtual path of the file.
    pub path: String,
    /// Nodes that should end up holding a copy. Empty means every node the
    /// roster knows at submission time.
    #[serde(default)]
    pub destinations: BTreeSet<String>,
    /// Lower runs first.
    #[serde(default)]
    pub priority: i32,
    /// How many of `destinations` must hold a copy.
    pub replicas: usize,
    /// Count only holders that are currently reachable.
    #[serde(default)]
    pub online_only: bool,
}

impl JobSpec {
    /// Spec for `path` to `destinations`.
    pub fn new<I, S>(path: impl Into<String>, destinations: I, replicas: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into(),
            destinations: destinations.into_iter().map(Into::into).collect(),
            priority: 0,
            replicas,
            online_only: false,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Count only reachable holders towards the target.
    pub fn with_online_only(mut self, online_only: bool) -> Self {
        self.online_only = online_only;
        self
    }

    /// Number of `holders` that count towards the replica target: those in
    /// `destinations`, and only reachable ones when `online_only` is set.
    pub fn counted_holders(&self, holders: &[Node]) -> usize {
        holders
            .iter()
            .filter(|h| self.destinations.contains(&h.name))
            .filter(|h| !self.online_only || h.is_available())
            .count()
    }

    /// Whether `holders` meet the replica target.
    pub fn is_satisfied_by(&self, holders: &[Node]) -> bool {
        self.counted_holders(holders) >= self.replicas
    }

    /// Check the spec is self-consistent.
    pub fn validate(&self) -> JobResult<()> {
        let invalid = |reason: String| Err(JobError::InvalidJob { reason });
        if self.path.is_empty() || !self.path.starts_with('/') {
            return invalid(format!("path '{}' must be absolute", self.path));
        }
        if self.destinations.is_empty() {
            return invalid("no destination nodes".to_string());
        }
        if self.replicas == 0 || self.replicas > self.destinations.len() {
            return invalid(format!(
                "replica count {} must be between 1 and the {} destination(s)",
                self.replicas,
                self.destinations.len()
            ));
        }
        Ok(())
    }
}

/// Nodes bound to a running leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Sending node.
    pub source: String,
    /// Receiving node.
    pub destination: String,
}

/// A queued job.
#[derive(Debug)]
pub struct Job {
    index: JobIndex,
    spec: JobSpec,
    state: JobState,
    binding: Option<Binding>,
    progress: Arc<TransferProgress>,
    cancel: Option<CancellationToken>,
    time_spent: Duration,
}

impl Job {
    pub(crate) fn new(index: JobIndex, spec: JobSpec) -> Self {
        Self {
            index,
            spec,
            state: JobState::Queued,
            binding: None,
            progress: Arc::new(TransferProgress::default()),
            cancel: None,
            time_spent: Duration::ZERO,
        }
    }

    /// Display index.
    pub fn index(&self) -> JobIndex {
        self.index
    }

    /// The submitted request.
    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    /// Virtual path.
    pub fn path(&self) -> &str {
        &self.spec.path
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Source and destination of the running leg.
    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    /// Whether this job wants a copy on `node`.
    pub fn targets(&self, node: &str) -> bool {
        self.spec.destinations.contains(node)
    }

    /// Total time spent in legs so far.
    pub fn time_spent(&self) -> Duration {
        self.time_spent
    }

    pub(crate) fn begin(&mut self, binding: Binding, size: u64) -> ActiveLeg {
        let progress = Arc::new(TransferProgress::new(size));
        let cancel = CancellationToken::new();
        self.state = JobState::Transferring;
        self.binding = Some(binding.clone());
        self.progress = Arc::clone(&progress);
        self.cancel = Some(cancel.clone());
        ActiveLeg {
            index: self.index,
            binding,
            progress,
            cancel,
        }
    }

    pub(crate) fn finish(&mut self, elapsed: Duration) {
        self.state = JobState::Queued;
        self.binding = None;
        self.cancel = None;
        self.time_spent += elapsed;
    }

    pub(crate) fn terminate(&mut self, state: JobState) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.state = state;
    }

    /// Point-in-time view for listings.
    pub fn snapshot(&self) -> JobSnapshot {
        let (source, destination) = match &self.binding {
            Some(b) => (Some(b.source.clone()), Some(b.destination.clone())),
            None => (None, None),
        };
        let running = self.state == JobState::Transferring;
        JobSnapshot {
            index: self.index,
            path: self.spec.path.clone(),
            state: self.state,
            priority: self.spec.priority,
            replicas: self.spec.replicas,
            destinations: self.spec.destinations.clone(),
            transferred: if running { self.progress.transferred() } else { 0 },
            total: self.progress.total(),
            speed_bps: if running { self.progress.speed_bps() } else { 0 },
            source,
            destination,
            time_spent: self.time_spent,
        }
    }
}

/// Handle on a running leg, held by the scheduler outside the queue lock.
#[derive(Debug, Clone)]
pub struct ActiveLeg {
    /// Job the leg belongs to.
    pub index: JobIndex,
    /// Nodes involved.
    pub binding: Binding,
    /// Live progress shared with listings.
    pub progress: Arc<TransferProgress>,
    /// Fired when the job is stopped.
    pub cancel: CancellationToken,
}

/// Listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    /// Display index.
    pub index: JobIndex,
    /// Virtual path.
    pub path: String,
    /// State at snapshot time.
    pub state: JobState,
    /// Priority, lower first.
    pub priority: i32,
    /// Replica target.
    pub replicas: usize,
    /// Desired destinations.
    pub destinations: BTreeSet<String>,
    /// Bytes moved by the running leg.
    pub transferred: u64,
    /// Size of the file, as of the last leg.
    pub total: u64,
    /// Running leg speed.
    pub speed_bps: u64,
    /// Running leg source.
    pub source: Option<String>,
    /// Running leg destination.
    pub destination: Option<String>,
    /// Accumulated leg time.
    pub time_spent: Duration,
}
