//! The job queue: one lock for every mutation and snapshot.
//!
//! Jobs are kept sorted by (priority, index). No lock is held across an
//! await point; the scheduler copies what it needs and runs legs unlocked.

use crate::error::{JobError, JobResult};
use crate::job::{ActiveLeg, Binding, Job, JobIndex, JobSnapshot, JobSpec, JobState};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::info;

/// What the scheduler needs to know about a queued job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingJob {
    /// Display index.
    pub index: JobIndex,
    /// The submitted request, copied out of the queue.
    pub spec: JobSpec,
}

impl PendingJob {
    /// Virtual path.
    pub fn path(&self) -> &str {
        &self.spec.path
    }
}

#[derive(Debug, Default)]
struct Inner {
    jobs: Vec<Job>,
    next_index: JobIndex,
}

impl Inner {
    fn position(&self, index: JobIndex) -> Option<usize> {
        self.jobs.iter().position(|j| j.index() == index)
    }
}

/// Shared job queue.
#[derive(Debug, Default)]
pub struct JobQueue {
    inner: Mutex<Inner>,
    changed: Notify,
}

impl JobQueue {
    /// Empty queue; the first job gets index 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs queued or transferring.
    pub fn len(&self) -> usize {
        self.inner.lock().jobs.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().jobs.is_empty()
    }

    /// Enqueue `spec`. Rejects a spec sharing a path and destination with a
    /// job already in the queue.
    pub fn push(&self, spec: JobSpec) -> JobResult<JobSnapshot> {
        let snapshot = {
            let mut inner = self.inner.lock();
            for job in inner.jobs.iter().filter(|j| j.path() == spec.path) {
                if let Some(node) = spec.destinations.iter().find(|d| job.targets(d)) {
                    return Err(JobError::DuplicateJob {
                        path: spec.path.clone(),
                        node: node.clone(),
                    });
                }
            }
            inner.next_index += 1;
            let index = inner.next_index;
            let job = Job::new(index, spec);
            let key = (job.spec().priority, index);
            let at = inner
                .jobs
                .partition_point(|j| (j.spec().priority, j.index()) < key);
            let snapshot = job.snapshot();
            inner.jobs.insert(at, job);
            snapshot
        };
        info!(job = snapshot.index, path = %snapshot.path, priority = snapshot.priority, "job queued");
        self.changed.notify_one();
        Ok(snapshot)
    }

    /// Hand out the next index without queueing anything.
    pub(crate) fn allocate_index(&self) -> JobIndex {
        let mut inner = self.inner.lock();
        inner.next_index += 1;
        inner.next_index
    }

    /// Listing rows, in run order.
    pub fn snapshot(&self) -> Vec<JobSnapshot> {
        self.inner.lock().jobs.iter().map(Job::snapshot).collect()
    }

    /// Row for one job.
    pub fn get(&self, index: JobIndex) -> JobResult<JobSnapshot> {
        let inner = self.inner.lock();
        inner
            .position(index)
            .map(|at| inner.jobs[at].snapshot())
            .ok_or(JobError::JobNotFound { index })
    }

    /// Queued (not transferring) jobs, in run order.
    pub fn pending(&self) -> Vec<PendingJob> {
        self.inner
            .lock()
            .jobs
            .iter()
            .filter(|j| j.state() == JobState::Queued)
            .map(|j| PendingJob {
                index: j.index(),
                spec: j.spec().clone(),
            })
            .collect()
    }

    /// Bind a leg to a queued job. `None` if the job left the queue or is
    /// already transferring.
    pub fn begin_transfer(
        &self,
        index: JobIndex,
        binding: Binding,
        size: u64,
    ) -> Option<ActiveLeg> {
        let mut inner = self.inner.lock();
        let at = inner.position(index)?;
        let job = &mut inner.jobs[at];
        if job.state() != JobState::Queued {
            return None;
        }
        Some(job.begin(binding, size))
    }

    /// Return a job to QUEUED after its leg. `false` if the job was removed
    /// while the leg ran.
    pub fn finish_transfer(&self, index: JobIndex, elapsed: Duration) -> bool {
        let mut inner = self.inner.lock();
        match inner.position(index) {
            Some(at) => {
                inner.jobs[at].finish(elapsed);
                true
            }
            None => false,
        }
    }

    /// Move a job to a terminal state and dequeue it, cancelling any running
    /// leg.
    pub fn terminate(&self, index: JobIndex, state: JobState) -> Option<JobSnapshot> {
        let mut job = {
            let mut inner = self.inner.lock();
            let at = inner.position(index)?;
            inner.jobs.remove(at)
        };
        job.terminate(state);
        info!(job = index, path = %job.path(), state = %state, "job dequeued");
        Some(job.snapshot())
    }

    /// Dequeue every job matching `pick`, marking them ABORTED. Returns the
    /// removed rows.
    pub fn abort_where(&self, mut pick: impl FnMut(&Job) -> bool) -> Vec<JobSnapshot> {
        let removed: Vec<Job> = {
            let mut inner = self.inner.lock();
            let (gone, kept): (Vec<Job>, Vec<Job>) = std::mem::take(&mut inner.jobs)
                .into_iter()
                .partition(|j| pick(j));
            inner.jobs = kept;
            gone
        };
        if !removed.is_empty() {
            self.changed.notify_one();
        }
        removed
            .into_iter()
            .map(|mut job| {
                job.terminate(JobState::Aborted);
                info!(job = job.index(), path = %job.path(), "job removed");
                job.snapshot()
            })
            .collect()
    }

    /// Wait until an operator changes the queue.
    pub async fn changed(&self) {
        self.changed.notified().await;
    }
}
