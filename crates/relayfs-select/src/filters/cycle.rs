//! `cycle`: deterministic tie-break across repeated calls.
//!
//! Among the candidates tied for the current maximum, the least recently
//! favoured one gets +1. "Least recently" is decided by this filter's own
//! grant ledger first (never granted sorts first) and then by the candidate's
//! last-activity marker, oldest first. Remaining ties go to the first-seen
//! candidate.

use crate::candidate::Candidate;
use crate::filter::{Filter, SelectionContext};
use crate::scoreboard::ScoreBoard;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::trace;

/// Rotating tie-break.
#[derive(Debug, Default)]
pub struct CycleFilter {
    ledger: Mutex<Ledger>,
}

#[derive(Debug, Default)]
struct Ledger {
    sequence: u64,
    granted: HashMap<String, u64>,
}

impl CycleFilter {
    /// New filter with an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Candidate> Filter<C> for CycleFilter {
    fn name(&self) -> &'static str {
        "cycle"
    }

    fn process(&self, board: &mut ScoreBoard<C>, _ctx: &SelectionContext) {
        let Some(max) = board.max_score() else {
            return;
        };

        let mut ledger = self.ledger.lock();
        let chosen = board
            .iter()
            .filter(|s| s.score() == max)
            .min_by_key(|s| {
                (
                    ledger.granted.get(s.name()).copied().unwrap_or(0),
                    s.candidate().status().last_activity_ms,
                )
            })
            .map(|s| s.name().to_string());

        if let Some(name) = chosen {
            ledger.sequence += 1;
            let seq = ledger.sequence;
            ledger.granted.insert(name.clone(), seq);
            drop(ledger);
            trace!(candidate = %name, "cycle tie-break");
            let _ = board.add(&name, 1);
        }
    }
}
