//! The replication scheduler.
//!
//! Each tick takes one snapshot of the available nodes and of the queued
//! jobs, walks the jobs in run order and stops at the first job for which
//! both a source and a destination can be selected. At most one leg runs
//! per tick, outside the queue lock. Ticks are fixed-delay: the next one is
//! scheduled only after the previous one has returned.

use crate::collab::{FileIndex, NodeRoster, TransferAgent};
use crate::error::{JobError, JobResult};
use crate::job::{Binding, JobIndex, JobSpec, JobState};
use crate::queue::{JobQueue, PendingJob};
use crate::settings::JobSettings;
use crate::transfer::{TransferOutcome, TransferRequest};
use parking_lot::RwLock;
use relayfs_select::{Node, NodeSelection, SelectError};
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of one matching attempt.
#[derive(Debug)]
enum Match {
    Pair { source: String, destination: String },
    Satisfied,
    NoSource,
    NoDestination,
}

/// How a leg ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegResult {
    /// The destination now holds a verified copy.
    Replicated {
        /// Bytes written.
        bytes: u64,
        /// Average speed.
        speed_bps: u64,
    },
    /// The destination already held a copy with the source's checksum; it
    /// was kept and recorded instead of copied again.
    Adopted,
    /// Checksums differed; the destination copy was deleted.
    ChecksumMismatch,
    /// The source no longer had the file and was dropped as a holder.
    SourceMissing,
    /// The job was stopped while the leg ran.
    Cancelled,
    /// The leg failed on one side; any partial copy was deleted.
    Failed(String),
    /// The job left the queue or changed state before the leg could start.
    NotStarted,
}

/// The leg run by a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegReport {
    /// Job the leg belonged to.
    pub index: JobIndex,
    /// Sending node.
    pub source: String,
    /// Receiving node.
    pub destination: String,
    /// Outcome.
    pub result: LegResult,
}

/// What a tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Jobs that reached DONE.
    pub completed: Vec<JobIndex>,
    /// Jobs aborted because the file is gone.
    pub aborted: Vec<JobIndex>,
    /// Jobs with no usable destination this tick.
    pub skipped: Vec<JobIndex>,
    /// Nodes marked busy.
    pub busy: BTreeSet<String>,
    /// Leg run, if any.
    pub leg: Option<LegReport>,
}

/// Drives jobs from the queue through Node Selection and the transfer agent.
pub struct JobScheduler {
    queue: Arc<JobQueue>,
    selection: Arc<NodeSelection>,
    roster: Arc<dyn NodeRoster>,
    files: Arc<dyn FileIndex>,
    agent: Arc<dyn TransferAgent>,
    settings: RwLock<Arc<JobSettings>>,
    stopped: AtomicBool,
    wake: Notify,
}

impl JobScheduler {
    /// Scheduler over the given collaborators.
    pub fn new(
        queue: Arc<JobQueue>,
        selection: Arc<NodeSelection>,
        roster: Arc<dyn NodeRoster>,
        files: Arc<dyn FileIndex>,
        agent: Arc<dyn TransferAgent>,
        settings: JobSettings,
    ) -> Self {
        Self {
            queue,
            selection,
            roster,
            files,
            agent,
            settings: RwLock::new(Arc::new(settings)),
            stopped: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    /// The job queue.
    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    /// Node Selection used for matching.
    pub fn selection(&self) -> &Arc<NodeSelection> {
        &self.selection
    }

    /// Node roster.
    pub fn roster(&self) -> &Arc<dyn NodeRoster> {
        &self.roster
    }

    /// File index.
    pub fn files(&self) -> &Arc<dyn FileIndex> {
        &self.files
    }

    /// Active settings.
    pub fn settings(&self) -> Arc<JobSettings> {
        Arc::clone(&self.settings.read())
    }

    /// Validate and publish new settings. Invalid settings leave the active
    /// ones untouched.
    pub fn apply_settings(&self, settings: JobSettings) -> JobResult<()> {
        settings.validate()?;
        info!(
            sleep_seconds = settings.sleep_seconds,
            verify_checksum = settings.verify_checksum,
            secure_transfers = settings.secure_transfers,
            "job settings applied"
        );
        *self.settings.write() = Arc::new(settings);
        self.wake.notify_one();
        Ok(())
    }

    /// Pause matching. Running legs finish.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!("job scheduler stopped");
        }
    }

    /// Resume matching and tick promptly.
    pub fn start(&self) {
        if self.stopped.swap(false, Ordering::SeqCst) {
            info!("job scheduler started");
        }
        self.wake.notify_one();
    }

    /// Whether matching is paused.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Run ticks until `shutdown` fires.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            interval_secs = self.settings().sleep_seconds,
            "job scheduler running"
        );
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                report = self.tick() => {
                    if report.leg.is_some() || !report.completed.is_empty() || !report.aborted.is_empty() {
                        debug!(?report, "tick finished");
                    }
                }
            }
            let delay = self.settings().interval();
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
                _ = self.queue.changed() => debug!("queue changed, ticking early"),
                _ = self.wake.notified() => {}
            }
        }
        info!("job scheduler exited");
    }

    /// One scheduling pass.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        if self.is_stopped() {
            return report;
        }

        let nodes = match self.roster.available_nodes().await {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(error = %e, "cannot list nodes, skipping tick");
                return report;
            }
        };

        let mut busy: HashSet<String> = HashSet::new();
        let mut matched = None;

        for job in self.queue.pending() {
            if nodes.iter().all(|n| busy.contains(&n.name)) {
                debug!("every available node is busy");
                break;
            }
            match self.match_job(&job, &nodes, &mut busy).await {
                Ok(Match::Pair {
                    source,
                    destination,
                }) => {
                    matched = Some((job, source, destination));
                    break;
                }
                Ok(Match::Satisfied) => {
                    if self.complete(&job).await {
                        report.completed.push(job.index);
                    }
                }
                Ok(Match::NoSource) => {
                    debug!(job = job.index, path = %job.path(), "no source available, holders marked busy");
                }
                Ok(Match::NoDestination) => {
                    debug!(job = job.index, path = %job.path(), "no destination available, skipping");
                    report.skipped.push(job.index);
                }
                Err(JobError::FileGone { .. }) => {
                    self.abort_gone(&job);
                    report.aborted.push(job.index);
                }
                Err(e) => {
                    warn!(job = job.index, path = %job.path(), error = %e, "job matching failed");
                    report.skipped.push(job.index);
                }
            }
        }

        report.busy = busy.into_iter().collect();

        if let Some((job, source, destination)) = matched {
            let leg = self.run_leg(&job, source, destination).await;
            if leg.result != LegResult::NotStarted {
                match self.recheck(&job).await {
                    Some(JobState::Done) => report.completed.push(job.index),
                    Some(JobState::Aborted) => report.aborted.push(job.index),
                    _ => {}
                }
            }
            report.leg = Some(leg);
        }
        report
    }

    async fn match_job(
        &self,
        job: &PendingJob,
        nodes: &[Node],
        busy: &mut HashSet<String>,
    ) -> JobResult<Match> {
        let holders = self.files.holding_nodes(job.path()).await?;
        if holders.is_empty() {
            return Err(JobError::FileGone {
                path: job.path().to_string(),
            });
        }
        if job.spec.is_satisfied_by(&holders) {
            return Ok(Match::Satisfied);
        }

        let sources: Vec<Node> = nodes
            .iter()
            .filter(|n| holders.iter().any(|h| h.name == n.name))
            .cloned()
            .collect();
        let source = match self
            .selection
            .select_job_source(&sources, busy, job.path())
        {
            Ok(node) => node,
            Err(SelectError::NoCandidateAvailable) => {
                busy.extend(holders.iter().map(|h| h.name.clone()));
                return Ok(Match::NoSource);
            }
            Err(e) => return Err(e.into()),
        };

        let destinations: Vec<Node> = nodes
            .iter()
            .filter(|n| job.spec.destinations.contains(&n.name))
            .cloned()
            .collect();
        match self.selection.select_job_destination(
            &destinations,
            &holders,
            busy,
            job.path(),
            &source.name,
        ) {
            Ok(destination) => Ok(Match::Pair {
                source: source.name,
                destination: destination.name,
            }),
            Err(SelectError::NoCandidateAvailable) => Ok(Match::NoDestination),
            Err(e) => Err(e.into()),
        }
    }

    async fn run_leg(&self, job: &PendingJob, source: String, destination: String) -> LegReport {
        let settings = self.settings();
        let mut report = LegReport {
            index: job.index,
            source: source.clone(),
            destination: destination.clone(),
            result: LegResult::NotStarted,
        };

        let size = match self.files.size(job.path()).await {
            Ok(size) => size,
            Err(e) => {
                warn!(job = job.index, path = %job.path(), error = %e, "cannot read file size");
                return report;
            }
        };
        let binding = Binding {
            source: source.clone(),
            destination: destination.clone(),
        };
        let Some(leg) = self.queue.begin_transfer(job.index, binding, size) else {
            return report;
        };

        info!(
            job = job.index,
            path = %job.path(),
            source = %source,
            destination = %destination,
            bytes = size,
            "transfer started"
        );
        let request = TransferRequest {
            path: job.path().to_string(),
            source,
            destination,
            secure: settings.secure_transfers,
            checksum: settings.verify_checksum,
        };
        leg.progress.start();
        let result = self
            .agent
            .transfer(&request, &leg.progress, &leg.cancel)
            .await;
        self.queue
            .finish_transfer(job.index, leg.progress.elapsed());

        report.result = self
            .settle(job.index, &request, result, settings.verify_checksum)
            .await;
        report
    }

    async fn settle(
        &self,
        index: JobIndex,
        request: &TransferRequest,
        result: JobResult<TransferOutcome>,
        verify: bool,
    ) -> LegResult {
        let path = request.path.as_str();
        match result {
            Ok(outcome) if outcome.existing => {
                if outcome.checksum_mismatch() {
                    warn!(job = index, path, destination = %request.destination, "existing copy differs, deleting it");
                    self.discard(&request.destination, path).await;
                    return LegResult::ChecksumMismatch;
                }
                if let Err(e) = self.files.add_holder(path, &request.destination).await {
                    warn!(job = index, path, error = %e, "cannot record existing copy");
                    return LegResult::Failed(e.to_string());
                }
                info!(job = index, path, destination = %request.destination, "existing copy matches, kept");
                LegResult::Adopted
            }
            Ok(outcome) if verify && outcome.checksum_mismatch() => {
                let err = JobError::Checksum {
                    path: path.to_string(),
                    source_crc: outcome.source_checksum.unwrap_or_default(),
                    dest_crc: outcome.destination_checksum.unwrap_or_default(),
                };
                warn!(job = index, destination = %request.destination, error = %err, "deleting bad copy");
                self.discard(&request.destination, path).await;
                LegResult::ChecksumMismatch
            }
            Ok(outcome) => {
                if let Err(e) = self.files.add_holder(path, &request.destination).await {
                    warn!(job = index, path, error = %e, "cannot record new holder");
                    return LegResult::Failed(e.to_string());
                }
                info!(
                    job = index,
                    path,
                    destination = %request.destination,
                    bytes = outcome.bytes,
                    speed_bps = outcome.speed_bps(),
                    "transfer complete"
                );
                LegResult::Replicated {
                    bytes: outcome.bytes,
                    speed_bps: outcome.speed_bps(),
                }
            }
            Err(JobError::FileGone { .. }) => {
                warn!(job = index, path, source = %request.source, "source no longer has the file");
                if let Err(e) = self.files.remove_holder(path, &request.source).await {
                    debug!(path, error = %e, "cannot drop holder");
                }
                self.discard(&request.destination, path).await;
                LegResult::SourceMissing
            }
            Err(JobError::Cancelled) => {
                info!(job = index, path, "transfer cancelled");
                self.discard(&request.destination, path).await;
                LegResult::Cancelled
            }
            Err(e) => {
                warn!(job = index, path, error = %e, "transfer failed");
                self.discard(&request.destination, path).await;
                LegResult::Failed(e.to_string())
            }
        }
    }

    /// Delete a copy the file index does not know about.
    async fn discard(&self, node: &str, path: &str) {
        if let Err(e) = self.agent.delete(node, path).await {
            debug!(node, path, error = %e, "nothing to delete");
        }
    }

    /// Re-evaluate a job after its leg. Returns the terminal state reached.
    async fn recheck(&self, job: &PendingJob) -> Option<JobState> {
        match self.files.holding_nodes(job.path()).await {
            Ok(holders) if holders.is_empty() => {
                self.abort_gone(job);
                Some(JobState::Aborted)
            }
            Ok(holders) if job.spec.is_satisfied_by(&holders) => {
                self.complete(job).await.then_some(JobState::Done)
            }
            Ok(_) => None,
            Err(e) if e.is_file_gone() => {
                self.abort_gone(job);
                Some(JobState::Aborted)
            }
            Err(e) => {
                warn!(job = job.index, error = %e, "cannot recheck job");
                None
            }
        }
    }

    fn abort_gone(&self, job: &PendingJob) {
        warn!(job = job.index, path = %job.path(), "file gone, aborting job");
        self.queue.terminate(job.index, JobState::Aborted);
    }

    async fn complete(&self, job: &PendingJob) -> bool {
        if self.queue.terminate(job.index, JobState::Done).is_none() {
            return false;
        }
        self.cleanup(&job.spec).await;
        true
    }

    /// Remove the copies a finished job no longer wants. Every holder
    /// outside the destinations goes; then, while more than `replicas`
    /// copies remain, offline holders go before online ones. Offline
    /// holders are only forgotten, never contacted.
    pub(crate) async fn cleanup(&self, spec: &JobSpec) {
        let holders = match self.files.holding_nodes(&spec.path).await {
            Ok(holders) => holders,
            Err(e) => {
                debug!(path = %spec.path, error = %e, "nothing to clean up");
                return;
            }
        };
        let (outside, mut inside): (Vec<Node>, Vec<Node>) = holders
            .into_iter()
            .partition(|n| !spec.destinations.contains(&n.name));
        for node in &outside {
            self.drop_copy(node, &spec.path).await;
        }

        inside.sort_by_key(Node::is_available);
        let mut remaining = inside.len();
        for node in &inside {
            if remaining <= spec.replicas {
                break;
            }
            if self.drop_copy(node, &spec.path).await {
                remaining -= 1;
            }
        }
    }

    async fn drop_copy(&self, node: &Node, path: &str) -> bool {
        if node.is_available() {
            if let Err(e) = self.agent.delete(&node.name, path).await {
                warn!(node = %node.name, path, error = %e, "cannot delete surplus copy");
                return false;
            }
        }
        if let Err(e) = self.files.remove_holder(path, &node.name).await {
            warn!(node = %node.name, path, error = %e, "cannot forget surplus copy");
            return false;
        }
        info!(node = %node.name, path, online = node.is_available(), "surplus copy removed");
        true
    }
}
