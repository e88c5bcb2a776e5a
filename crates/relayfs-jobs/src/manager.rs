//! Administrative surface over the queue and scheduler.

use crate::error::{JobError, JobResult};
use crate::job::{Job, JobIndex, JobSnapshot, JobSpec, JobState};
use crate::scheduler::JobScheduler;
use crate::settings::JobSettings;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Inclusive range of job indices, written `N` or `N-M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    low: JobIndex,
    high: JobIndex,
}

impl IndexRange {
    /// Parse `N` or `N-M` with `0 < N <= M`.
    pub fn parse(text: &str) -> JobResult<Self> {
        let bad = |reason: &str| JobError::InvalidRange {
            range: text.to_string(),
            reason: reason.to_string(),
        };
        let number = |s: &str| {
            s.trim()
                .parse::<JobIndex>()
                .map_err(|_| bad("not a job number"))
        };
        let (low, high) = match text.split_once('-') {
            Some((low, high)) => (number(low)?, number(high)?),
            None => {
                let n = number(text)?;
                (n, n)
            }
        };
        if low == 0 {
            return Err(bad("job numbers start at 1"));
        }
        if low > high {
            return Err(bad("start is after end"));
        }
        Ok(Self { low, high })
    }

    /// Parse a comma or whitespace separated list of ranges.
    pub fn parse_list(text: &str) -> JobResult<Vec<Self>> {
        text.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Whether `index` falls in the range.
    pub fn contains(&self, index: JobIndex) -> bool {
        (self.low..=self.high).contains(&index)
    }
}

impl FromStr for IndexRange {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}-{}", self.low, self.high)
        }
    }
}

/// Operator commands: add, list, remove, start and stop.
#[derive(Clone)]
pub struct JobManager {
    scheduler: Arc<JobScheduler>,
}

impl JobManager {
    /// Manager over `scheduler`.
    pub fn new(scheduler: Arc<JobScheduler>) -> Self {
        Self { scheduler }
    }

    /// The scheduler being managed.
    pub fn scheduler(&self) -> &Arc<JobScheduler> {
        &self.scheduler
    }

    /// Submit a job. A spec with no destinations targets every available
    /// node. A job whose target is already met comes back DONE and is not
    /// queued; copies it no longer wants are cleaned up as for any finished
    /// job.
    pub async fn add_job(&self, mut spec: JobSpec) -> JobResult<JobSnapshot> {
        if spec.destinations.is_empty() {
            spec.destinations = self
                .scheduler
                .roster()
                .available_nodes()
                .await?
                .into_iter()
                .map(|n| n.name)
                .collect();
        }
        spec.validate()?;

        let holders = self.scheduler.files().holding_nodes(&spec.path).await?;
        if holders.is_empty() {
            return Err(JobError::FileGone { path: spec.path });
        }

        let queue = self.scheduler.queue();
        if spec.is_satisfied_by(&holders) {
            let mut job = Job::new(queue.allocate_index(), spec);
            job.terminate(JobState::Done);
            info!(job = job.index(), path = %job.path(), "replica target already met, not queued");
            self.scheduler.cleanup(job.spec()).await;
            return Ok(job.snapshot());
        }
        queue.push(spec)
    }

    /// Every queued or transferring job, in run order.
    pub fn list_jobs(&self) -> Vec<JobSnapshot> {
        self.scheduler.queue().snapshot()
    }

    /// Jobs with a leg in flight.
    pub fn list_running_jobs(&self) -> Vec<JobSnapshot> {
        self.list_jobs()
            .into_iter()
            .filter(|j| j.state == JobState::Transferring)
            .collect()
    }

    /// Stop one job, cancelling its leg if running.
    pub fn remove_job(&self, index: JobIndex) -> JobResult<JobSnapshot> {
        self.scheduler
            .queue()
            .abort_where(|j| j.index() == index)
            .pop()
            .ok_or(JobError::JobNotFound { index })
    }

    /// Stop every job in `ranges`, cancelling running legs.
    pub fn remove_jobs(&self, ranges: &[IndexRange]) -> Vec<JobSnapshot> {
        self.scheduler
            .queue()
            .abort_where(|j| ranges.iter().any(|r| r.contains(j.index())))
    }

    /// Drop every job without a running leg.
    pub fn remove_idle_jobs(&self) -> Vec<JobSnapshot> {
        self.scheduler
            .queue()
            .abort_where(|j| j.state() != JobState::Transferring)
    }

    /// Resume the scheduler.
    pub fn start_jobs(&self) {
        self.scheduler.start();
    }

    /// Pause the scheduler. Running legs finish.
    pub fn stop_jobs(&self) {
        self.scheduler.stop();
    }

    /// Whether the scheduler is paused.
    pub fn is_stopped(&self) -> bool {
        self.scheduler.is_stopped()
    }

    /// Replace the scheduler settings; invalid ones are rejected.
    pub fn apply_settings(&self, settings: JobSettings) -> JobResult<()> {
        self.scheduler.apply_settings(settings)
    }
}
