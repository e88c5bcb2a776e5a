//! `maxtransfers`: drop candidates already running too many transfers in the
//! request direction.
//!
//! ```text
//! N.filter=maxtransfers
//! N.limit=4
//! ```

use crate::candidate::Candidate;
use crate::config::FilterProps;
use crate::error::SelectResult;
use crate::filter::{Filter, SelectionContext};
use crate::scoreboard::ScoreBoard;

/// Active-transfer cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxTransfersFilter {
    limit: u32,
}

impl MaxTransfersFilter {
    /// Filter removing candidates with `limit` or more active transfers.
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }

    /// Build from `N.limit`.
    pub fn from_props(props: &FilterProps<'_>) -> SelectResult<Self> {
        let limit = props
            .require("limit")?
            .parse()
            .map_err(|_| props.error("limit", "expected a non-negative integer"))?;
        Ok(Self::new(limit))
    }
}

impl<C: Candidate> Filter<C> for MaxTransfersFilter {
    fn name(&self) -> &'static str {
        "maxtransfers"
    }

    fn process(&self, board: &mut ScoreBoard<C>, ctx: &SelectionContext) {
        board.retain(|s| s.candidate().status().transfers(ctx.direction) < self.limit);
    }
}
