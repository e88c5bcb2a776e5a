//! Ordered, immutable filter chains.

use crate::candidate::Candidate;
use crate::error::SelectResult;
use crate::filter::{Filter, SelectionContext};
use crate::scoreboard::ScoreBoard;
use std::fmt;

/// Filters applied in configured order to one ScoreBoard per call.
pub struct FilterChain<C: Candidate> {
    source: String,
    filters: Vec<Box<dyn Filter<C>>>,
}

impl<C: Candidate> FilterChain<C> {
    /// Chain over `filters`; `source` names where it was loaded from.
    pub fn new(source: impl Into<String>, filters: Vec<Box<dyn Filter<C>>>) -> Self {
        Self {
            source: source.into(),
            filters,
        }
    }

    /// Chain with no filters: every candidate ties and the first one wins.
    pub fn empty(source: impl Into<String>) -> Self {
        Self::new(source, Vec::new())
    }

    /// Where this chain came from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// True for a chain with no filters.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filter names in order.
    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run every filter over `board`, in order.
    pub fn process(&self, board: &mut ScoreBoard<C>, ctx: &SelectionContext) {
        for filter in &self.filters {
            filter.process(board, ctx);
            if board.is_empty() {
                break;
            }
        }
    }

    /// Score `candidates` and return the best one.
    pub fn select(
        &self,
        candidates: impl IntoIterator<Item = C>,
        ctx: &SelectionContext,
    ) -> SelectResult<C> {
        let mut board = ScoreBoard::new(candidates);
        self.process(&mut board, ctx);
        board.into_best()
    }
}

impl<C: Candidate> fmt::Debug for FilterChain<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("source", &self.source)
            .field("filters", &self.filters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{Direction, LiveStatus, Node};
    use crate::error::SelectError;
    use crate::filters::{CapacityFilter, CycleFilter, PathMatchFilter, PathRule};

    fn node(name: &str, available: u64) -> Node {
        Node::new(name, LiveStatus::idle(available, 1000))
    }

    fn ctx(path: &str) -> SelectionContext {
        SelectionContext::new(Direction::Receiving, path)
    }

    #[test]
    fn test_empty_chain_first_seen_wins() {
        let chain: FilterChain<Node> = FilterChain::empty("none");
        let winner = chain
            .select(vec![node("a", 0), node("b", 0)], &ctx("/f"))
            .unwrap();
        assert_eq!(winner.name, "a");
    }

    #[test]
    fn test_order_is_observable() {
        // Removing `a` first leaves `b` alone at the top for the tie-break;
        // tie-breaking first spends the +1 on `a`, which is then removed.
        let drop_small = || Box::new(CapacityFilter::new(100, 0.0)) as Box<dyn Filter<Node>>;
        let tie_break = || Box::new(CycleFilter::new()) as Box<dyn Filter<Node>>;
        let ab = FilterChain::new("ab", vec![drop_small(), tie_break()]);
        let ba = FilterChain::new("ba", vec![tie_break(), drop_small()]);

        let candidates = vec![node("a", 10), node("b", 500)];

        let mut board = ScoreBoard::new(candidates.clone());
        ab.process(&mut board, &ctx("/f"));
        assert!(!board.contains("a"));
        assert_eq!(board.score_for("b").unwrap(), 1);

        let mut board = ScoreBoard::new(candidates);
        ba.process(&mut board, &ctx("/f"));
        assert!(!board.contains("a"));
        assert_eq!(board.score_for("b").unwrap(), 0);

        assert_eq!(ab.filter_names(), vec!["minfreespace", "cycle"]);
        assert_eq!(ba.filter_names(), vec!["cycle", "minfreespace"]);
    }

    #[test]
    fn test_removal_before_penalty_changes_winner() {
        let drop_small: Box<dyn Filter<Node>> = Box::new(CapacityFilter::new(100, 0.0));
        let favour_a: Box<dyn Filter<Node>> = Box::new(PathMatchFilter::new(
            "matchdir",
            vec![PathRule::new("*", "a+1000").unwrap()],
        ));
        let remove_then_favour = FilterChain::new("x", vec![drop_small, favour_a]);
        let winner = remove_then_favour
            .select(vec![node("a", 10), node("b", 500)], &ctx("/f"))
            .unwrap();
        assert_eq!(winner.name, "b");

        let favour_only = FilterChain::new(
            "y",
            vec![Box::new(PathMatchFilter::new(
                "matchdir",
                vec![PathRule::new("*", "a+1000").unwrap()],
            )) as Box<dyn Filter<Node>>],
        );
        let winner = favour_only
            .select(vec![node("a", 10), node("b", 500)], &ctx("/f"))
            .unwrap();
        assert_eq!(winner.name, "a");
    }

    #[test]
    fn test_all_removed_is_no_candidate() {
        let chain = FilterChain::new(
            "r",
            vec![Box::new(CapacityFilter::new(100, 0.0)) as Box<dyn Filter<Node>>],
        );
        let err = chain
            .select(vec![node("a", 1), node("b", 2)], &ctx("/f"))
            .unwrap_err();
        assert!(matches!(err, SelectError::NoCandidateAvailable));
    }
}
