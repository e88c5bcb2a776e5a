#![warn(missing_docs)]

//! relayfs job subsystem: a queue of replication jobs and the scheduler that
//! moves files between nodes until each job's replica target is met.

pub mod collab;
pub mod error;
pub mod hook;
pub mod job;
pub mod manager;
pub mod memory;
pub mod queue;
pub mod scheduler;
pub mod settings;
pub mod transfer;

pub use collab::{FileIndex, NodeRoster, TransferAgent};
pub use error::{JobError, JobResult};
pub use hook::{MirrorRule, MirrorRules};
pub use job::{ActiveLeg, Binding, Job, JobIndex, JobSnapshot, JobSpec, JobState};
pub use manager::{IndexRange, JobManager};
pub use memory::MemoryCluster;
pub use queue::{JobQueue, PendingJob};
pub use scheduler::{JobScheduler, LegReport, LegResult, TickReport};
pub use settings::JobSettings;
pub use transfer::{TransferOutcome, TransferProgress, TransferRequest};
