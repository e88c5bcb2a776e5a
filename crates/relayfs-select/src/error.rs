//! Error types for the selection subsystem.

use thiserror::Error;

/// Result type alias for selection operations.
pub type SelectResult<T> = Result<T, SelectError>;

/// Errors raised while building filter chains or selecting a candidate.
#[derive(Debug, Error)]
pub enum SelectError {
    /// Every candidate was removed, or none was supplied. Callers retry later.
    #[error("no candidate available")]
    NoCandidateAvailable,

    /// The candidate is not (or no longer) on the score board.
    #[error("candidate not found on score board: {candidate}")]
    NotFound {
        /// Name of the missing candidate.
        candidate: String,
    },

    /// Malformed chain configuration.
    #[error("config error at {key}: {reason}")]
    Config {
        /// Property key (or file) the problem was found at.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A chain named a filter that is not registered for this engine.
    #[error("unknown filter '{name}' at position {position}")]
    UnknownFilter {
        /// Filter name as written in the configuration.
        name: String,
        /// 1-based position in the chain.
        position: usize,
    },

    /// Reading a chain file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SelectError {
    pub(crate) fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        SelectError::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// True when the caller should simply try again later.
    pub fn is_transient(&self) -> bool {
        matches!(self, SelectError::NoCandidateAvailable)
    }
}
