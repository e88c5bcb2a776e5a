//! `minfreespace`: penalise or drop candidates below a free-space floor.
//!
//! ```text
//! N.filter=minfreespace
//! N.remaining=100MB
//! N.multiplier=1
//! ```
//!
//! A multiplier of exactly 0 removes under-floor candidates instead of
//! applying a zero penalty.

use crate::candidate::Candidate;
use crate::config::FilterProps;
use crate::error::SelectResult;
use crate::filter::{Filter, SelectionContext};
use crate::scoreboard::ScoreBoard;
use crate::units::{parse_bytes, parse_multiplier, scaled_penalty};

/// Free-space floor filter.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityFilter {
    minimum: u64,
    multiplier: f64,
}

impl CapacityFilter {
    /// Filter with an explicit floor and multiplier.
    pub fn new(minimum: u64, multiplier: f64) -> Self {
        Self {
            minimum,
            multiplier,
        }
    }

    /// Build from `N.remaining` and optional `N.multiplier` (default 1).
    pub fn from_props(props: &FilterProps<'_>) -> SelectResult<Self> {
        let minimum =
            parse_bytes(props.require("remaining")?).map_err(|e| props.error("remaining", e))?;
        let multiplier = match props.get("multiplier") {
            Some(m) => parse_multiplier(m).map_err(|e| props.error("multiplier", e))?,
            None => 1.0,
        };
        Ok(Self::new(minimum, multiplier))
    }

    fn penalty(&self, available: u64) -> i64 {
        scaled_penalty(self.minimum.saturating_sub(available), self.multiplier)
    }
}

impl<C: Candidate> Filter<C> for CapacityFilter {
    fn name(&self) -> &'static str {
        "minfreespace"
    }

    fn process(&self, board: &mut ScoreBoard<C>, _ctx: &SelectionContext) {
        if self.multiplier == 0.0 {
            board.retain(|s| s.candidate().status().available_bytes >= self.minimum);
            return;
        }
        for entry in board.iter_mut() {
            let available = entry.candidate().status().available_bytes;
            if available < self.minimum {
                let delta = self.penalty(available);
                entry.add(delta);
            }
        }
    }
}
