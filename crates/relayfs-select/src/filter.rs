//! The Filter trait and the per-call context handed to every filter.

use crate::candidate::{Candidate, Direction};
use crate::scoreboard::ScoreBoard;
use std::net::IpAddr;

/// What a selection call is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionContext {
    /// Direction of the transfer as seen by the winning candidate.
    pub direction: Direction,
    /// Target path inside the virtual filesystem.
    pub path: String,
    /// Requesting user, if a client asked.
    pub requester: Option<String>,
    /// Client address, if a client asked.
    pub peer: Option<IpAddr>,
    /// Source node of a node-to-node transfer, when choosing its destination.
    pub source_node: Option<String>,
}

impl SelectionContext {
    /// Context for `path` with nothing else known.
    pub fn new(direction: Direction, path: impl Into<String>) -> Self {
        Self {
            direction,
            path: path.into(),
            requester: None,
            peer: None,
            source_node: None,
        }
    }

    /// Attach the requesting user.
    pub fn with_requester(mut self, requester: impl Into<String>) -> Self {
        self.requester = Some(requester.into());
        self
    }

    /// Attach the client address.
    pub fn with_peer(mut self, peer: IpAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Attach the source node of a node-to-node transfer.
    pub fn with_source_node(mut self, node: impl Into<String>) -> Self {
        self.source_node = Some(node.into());
        self
    }
}

/// A rule that adjusts or eliminates candidates on a ScoreBoard.
///
/// Filters run in chain order and see the cumulative board. Apart from the
/// cyclic tie-break rotation ledger they keep no state between calls.
pub trait Filter<C: Candidate>: Send + Sync {
    /// Registry name of the filter.
    fn name(&self) -> &'static str;

    /// Adjust `board` for one selection call.
    fn process(&self, board: &mut ScoreBoard<C>, ctx: &SelectionContext);
}
