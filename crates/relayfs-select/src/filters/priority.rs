//! `priority`: static per-candidate bonus applied on every call.
//!
//! ```text
//! N.filter=priority
//! N.assign=node1+50 node2-20
//! ```

use super::path_match::{AssignAction, Assignment};
use crate::candidate::Candidate;
use crate::config::FilterProps;
use crate::error::SelectResult;
use crate::filter::{Filter, SelectionContext};
use crate::scoreboard::ScoreBoard;

/// Fixed score adjustments independent of the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityFilter {
    assignments: Vec<Assignment>,
}

impl PriorityFilter {
    /// Build from `N.assign`. `remove` is not accepted here; use `matchdir` with `*`.
    pub fn from_props(props: &FilterProps<'_>) -> SelectResult<Self> {
        let assignments =
            Assignment::parse_list(props.require("assign")?).map_err(|e| props.error("assign", e))?;
        if assignments.iter().any(|a| a.action == AssignAction::Remove) {
            return Err(props.error("assign", "priority only adjusts scores"));
        }
        Ok(Self { assignments })
    }
}

impl<C: Candidate> Filter<C> for PriorityFilter {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn process(&self, board: &mut ScoreBoard<C>, _ctx: &SelectionContext) {
        for assignment in &self.assignments {
            assignment.apply(board);
        }
    }
}
