//! Throughput-based filters.
//!
//! `bandwidth` penalises every candidate by its current throughput in the
//! request direction. `maxbandwidth` does the same only for candidates at or
//! below a ceiling; candidates above it are left untouched, never removed.
//!
//! ```text
//! N.filter=bandwidth
//! N.multiplier=/10*10
//!
//! N.filter=maxbandwidth
//! N.limit=10MB
//! N.multiplier=1
//! ```

use crate::candidate::Candidate;
use crate::config::FilterProps;
use crate::error::SelectResult;
use crate::filter::{Filter, SelectionContext};
use crate::scoreboard::ScoreBoard;
use crate::units::{parse_bytes, parse_multiplier, scaled_penalty};

fn multiplier_from(props: &FilterProps<'_>) -> SelectResult<f64> {
    match props.get("multiplier") {
        Some(m) => parse_multiplier(m).map_err(|e| props.error("multiplier", e)),
        None => Ok(1.0),
    }
}

/// Throughput penalty.
#[derive(Debug, Clone, PartialEq)]
pub struct BandwidthFilter {
    multiplier: f64,
}

impl BandwidthFilter {
    /// Filter with an explicit multiplier.
    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }

    /// Build from optional `N.multiplier` (default 1).
    pub fn from_props(props: &FilterProps<'_>) -> SelectResult<Self> {
        Ok(Self::new(multiplier_from(props)?))
    }
}

impl<C: Candidate> Filter<C> for BandwidthFilter {
    fn name(&self) -> &'static str {
        "bandwidth"
    }

    fn process(&self, board: &mut ScoreBoard<C>, ctx: &SelectionContext) {
        for entry in board.iter_mut() {
            let throughput = entry.candidate().status().throughput(ctx.direction);
            entry.add(scaled_penalty(throughput, self.multiplier));
        }
    }
}

/// Throughput penalty that skips candidates above a ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct CeilingFilter {
    limit: u64,
    multiplier: f64,
}

impl CeilingFilter {
    /// Filter with an explicit ceiling in bytes per second.
    pub fn new(limit: u64, multiplier: f64) -> Self {
        Self { limit, multiplier }
    }

    /// Build from `N.limit` and optional `N.multiplier`.
    pub fn from_props(props: &FilterProps<'_>) -> SelectResult<Self> {
        let limit = parse_bytes(props.require("limit")?).map_err(|e| props.error("limit", e))?;
        Ok(Self::new(limit, multiplier_from(props)?))
    }
}

impl<C: Candidate> Filter<C> for CeilingFilter {
    fn name(&self) -> &'static str {
        "maxbandwidth"
    }

    fn process(&self, board: &mut ScoreBoard<C>, ctx: &SelectionContext) {
        for entry in board.iter_mut() {
            let throughput = entry.candidate().status().throughput(ctx.direction);
            if throughput > self.limit {
                continue;
            }
            entry.add(scaled_penalty(throughput, self.multiplier));
        }
    }
}
