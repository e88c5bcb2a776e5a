//! Error types for the job subsystem.

use relayfs_select::SelectError;
use thiserror::Error;

/// Result type alias for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Errors raised by the job queue, scheduler and their collaborators.
#[derive(Debug, Error)]
pub enum JobError {
    /// The backing file no longer exists.
    #[error("file gone: {path}")]
    FileGone {
        /// Virtual path of the file.
        path: String,
    },

    /// A node could not be reached.
    #[error("node unreachable: {node}")]
    NodeUnreachable {
        /// Node name.
        node: String,
    },

    /// Node Selection found nothing suitable.
    #[error("no candidate available")]
    NoCandidateAvailable,

    /// The job request is malformed.
    #[error("invalid job: {reason}")]
    InvalidJob {
        /// What is wrong with it.
        reason: String,
    },

    /// A queued job already covers this file and destination.
    #[error("duplicate job: {path} -> {node} is already queued")]
    DuplicateJob {
        /// Virtual path of the file.
        path: String,
        /// Destination already covered.
        node: String,
    },

    /// No queued job has this index.
    #[error("job not found: #{index}")]
    JobNotFound {
        /// Display index.
        index: u64,
    },

    /// A transfer leg failed on one side.
    #[error("transfer failed on {node}: {reason}")]
    Transfer {
        /// Node the failure happened on.
        node: String,
        /// Failure description.
        reason: String,
    },

    /// Source and destination copies differ.
    #[error("checksum mismatch for {path}: source {source_crc:08x}, destination {dest_crc:08x}")]
    Checksum {
        /// Virtual path of the file.
        path: String,
        /// CRC32 reported by the source.
        source_crc: u32,
        /// CRC32 reported by the destination.
        dest_crc: u32,
    },

    /// The transfer leg was cancelled.
    #[error("transfer cancelled")]
    Cancelled,

    /// Malformed job index range.
    #[error("invalid range '{range}': {reason}")]
    InvalidRange {
        /// The text as given.
        range: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Scheduler settings rejected.
    #[error("invalid settings: {reason}")]
    Settings {
        /// What is wrong with them.
        reason: String,
    },

    /// Selection failure other than an empty board.
    #[error("selection error: {0}")]
    Selection(#[source] SelectError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SelectError> for JobError {
    fn from(e: SelectError) -> Self {
        match e {
            SelectError::NoCandidateAvailable => JobError::NoCandidateAvailable,
            other => JobError::Selection(other),
        }
    }
}

impl JobError {
    /// Whether the error means the file itself is missing.
    pub fn is_file_gone(&self) -> bool {
        matches!(self, JobError::FileGone { .. })
    }
}
