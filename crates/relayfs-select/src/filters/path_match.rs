//! Path-match filter (`matchdir` on nodes, `assign` on volumes).
//!
//! An ordered list of glob rules, each carrying per-candidate adjustments.
//! Only the first rule whose glob matches the target path is applied.
//!
//! ```text
//! N.filter=matchdir
//! N.match=/incoming/*
//! N.assign=node1+100, node2-100
//! N.2.match=/archive/*
//! N.2.assign=ALL-50 node3-remove
//! ```
//!
//! `N.match`/`N.assign` is rule 1; further rules use `N.<k>.match`/`N.<k>.assign`
//! from k=2 upward. `ALL` targets every candidate and `remove` drops the target.

use crate::candidate::Candidate;
use crate::config::FilterProps;
use crate::error::{SelectError, SelectResult};
use crate::filter::{Filter, SelectionContext};
use crate::glob::GlobPattern;
use crate::scoreboard::ScoreBoard;

/// Which candidates an assignment applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignTarget {
    /// Every candidate still on the board.
    All,
    /// One candidate by name.
    Named(String),
}

/// What an assignment does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignAction {
    /// Add to the score.
    Adjust(i64),
    /// Remove from the board.
    Remove,
}

/// One `name+N` / `name-N` / `name-remove` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Target candidate(s).
    pub target: AssignTarget,
    /// Adjustment.
    pub action: AssignAction,
}

impl Assignment {
    /// Parse a single token such as `node1+100`, `node-2-100` or `ALL-remove`.
    pub fn parse(token: &str) -> Result<Self, String> {
        let (pos, negative) = match token.rfind('+') {
            Some(pos) => (pos, false),
            None => match token.rfind('-') {
                Some(pos) => (pos, true),
                None => return Err(format!("'{}' is not a valid assign expression", token)),
            },
        };

        let name = &token[..pos];
        let value = &token[pos + 1..];
        if name.is_empty() {
            return Err(format!("'{}' has no candidate name", token));
        }

        let target = if name.eq_ignore_ascii_case("all") {
            AssignTarget::All
        } else {
            AssignTarget::Named(name.to_string())
        };

        let action = if value.eq_ignore_ascii_case("remove") {
            AssignAction::Remove
        } else {
            let amount: i64 = value
                .parse()
                .map_err(|_| format!("'{}' has an invalid score '{}'", token, value))?;
            AssignAction::Adjust(if negative { -amount } else { amount })
        };

        Ok(Self { target, action })
    }

    /// Parse a list separated by commas and/or whitespace.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, String> {
        list.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(Self::parse)
            .collect()
    }

    pub(crate) fn apply<C: Candidate>(&self, board: &mut ScoreBoard<C>) {
        match (&self.target, self.action) {
            (AssignTarget::All, AssignAction::Remove) => board.retain(|_| false),
            (AssignTarget::All, AssignAction::Adjust(delta)) => board.add_all(delta),
            (AssignTarget::Named(name), AssignAction::Remove) => {
                board.remove(name);
            }
            (AssignTarget::Named(name), AssignAction::Adjust(delta)) => {
                // A name that is not a candidate in this call is not an error.
                let _ = board.add(name, delta);
            }
        }
    }
}

/// A glob and the assignments applied when it matches.
#[derive(Debug, Clone)]
pub struct PathRule {
    pattern: GlobPattern,
    assignments: Vec<Assignment>,
}

impl PathRule {
    /// Build a rule from a glob and an assignment list.
    pub fn new(pattern: &str, assign: &str) -> SelectResult<Self> {
        let pattern = GlobPattern::new(pattern)?;
        let assignments =
            Assignment::parse_list(assign).map_err(|e| SelectError::config(pattern.as_str(), e))?;
        if assignments.is_empty() {
            return Err(SelectError::config(pattern.as_str(), "empty assign list"));
        }
        Ok(Self {
            pattern,
            assignments,
        })
    }

    /// Whether the rule applies to `path`.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }
}

/// Ordered path rules; first match wins.
#[derive(Debug, Clone)]
pub struct PathMatchFilter {
    name: &'static str,
    rules: Vec<PathRule>,
}

impl PathMatchFilter {
    /// Filter over explicit rules, registered under `name`.
    pub fn new(name: &'static str, rules: Vec<PathRule>) -> Self {
        Self { name, rules }
    }

    /// Build from `N.match`/`N.assign` and `N.<k>.match`/`N.<k>.assign`.
    pub fn from_props(name: &'static str, props: &FilterProps<'_>) -> SelectResult<Self> {
        let mut rules = Vec::new();
        let first = props.require("match")?;
        let assign = props.require("assign")?;
        rules.push(PathRule::new(first, assign).map_err(|e| props.error("assign", e.to_string()))?);

        let mut k = 2;
        while let Some(pattern) = props.get(&format!("{}.match", k)) {
            let key = format!("{}.assign", k);
            let assign = props.require(&key)?;
            rules.push(PathRule::new(pattern, assign).map_err(|e| props.error(&key, e.to_string()))?);
            k += 1;
        }
        Ok(Self::new(name, rules))
    }

    /// Number of rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl<C: Candidate> Filter<C> for PathMatchFilter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn process(&self, board: &mut ScoreBoard<C>, ctx: &SelectionContext) {
        let Some(rule) = self.rules.iter().find(|r| r.matches(&ctx.path)) else {
            return;
        };
        for assignment in &rule.assignments {
            assignment.apply(board);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{Direction, LiveStatus, Node};
    use crate::config::ChainConfig;

    fn board() -> ScoreBoard<Node> {
        ScoreBoard::new(
            ["slaveA", "slaveB", "slaveC"]
                .iter()
                .map(|n| Node::new(*n, LiveStatus::idle(0, 0))),
        )
    }

    fn run(filter: &PathMatchFilter, board: &mut ScoreBoard<Node>, path: &str) {
        Filter::<Node>::process(
            filter,
            board,
            &SelectionContext::new(Direction::Sending, path),
        );
    }

    fn scores(board: &ScoreBoard<Node>) -> Vec<(String, i64)> {
        board
            .iter()
            .map(|s| (s.name().to_string(), s.score()))
            .collect()
    }

    mod assignment {
        use super::*;

        #[test]
        fn test_parse_tokens() {
            assert_eq!(
                Assignment::parse("slaveA+100").unwrap(),
                Assignment {
                    target: AssignTarget::Named("slaveA".into()),
                    action: AssignAction::Adjust(100),
                }
            );
            assert_eq!(
                Assignment::parse("slaveB-100").unwrap().action,
                AssignAction::Adjust(-100)
            );
            assert_eq!(
                Assignment::parse("ALL-remove").unwrap(),
                Assignment {
                    target: AssignTarget::All,
                    action: AssignAction::Remove,
                }
            );
        }

        #[test]
        fn test_dash_in_name() {
            let a = Assignment::parse("node-2-100").unwrap();
            assert_eq!(a.target, AssignTarget::Named("node-2".into()));
            assert_eq!(a.action, AssignAction::Adjust(-100));
        }

        #[test]
        fn test_parse_list_separators() {
            let list = Assignment::parse_list("a+1, b-2 c+3").unwrap();
            assert_eq!(list.len(), 3);
        }

        #[test]
        fn test_rejects_bad_tokens() {
            assert!(Assignment::parse("slaveA").is_err());
            assert!(Assignment::parse("+100").is_err());
            assert!(Assignment::parse("a+lots").is_err());
        }
    }

    #[test]
    fn test_matching_path_adjusts_named() {
        let filter = PathMatchFilter::new(
            "matchdir",
            vec![PathRule::new("/path1/*", "slaveA+100, slaveB-100").unwrap()],
        );
        let mut b = board();
        run(&filter, &mut b, "/path1/dir/file.txt");
        assert_eq!(
            scores(&b),
            vec![
                ("slaveA".to_string(), 100),
                ("slaveB".to_string(), -100),
                ("slaveC".to_string(), 0),
            ]
        );
    }

    #[test]
    fn test_non_matching_path_untouched() {
        let filter = PathMatchFilter::new(
            "matchdir",
            vec![PathRule::new("/path1/*", "slaveA+100, slaveB-100").unwrap()],
        );
        for path in ["/path2/dir/file.txt", "/"] {
            let mut b = board();
            run(&filter, &mut b, path);
            assert!(b.iter().all(|s| s.score() == 0));
            assert_eq!(b.len(), 3);
        }
    }

    #[test]
    fn test_all_and_remove() {
        let filter = PathMatchFilter::new(
            "matchdir",
            vec![PathRule::new("/path2/*", "ALL+100 slaveB-remove").unwrap()],
        );
        let mut b = board();
        run(&filter, &mut b, "/path2/dir/file.txt");
        assert_eq!(b.score_for("slaveA").unwrap(), 100);
        assert!(matches!(
            b.score_for("slaveB"),
            Err(SelectError::NotFound { .. })
        ));
        assert_eq!(b.score_for("slaveC").unwrap(), 100);
    }

    #[test]
    fn test_unknown_name_ignored() {
        let filter = PathMatchFilter::new(
            "matchdir",
            vec![PathRule::new("*", "ghost+100 slaveC+1").unwrap()],
        );
        let mut b = board();
        run(&filter, &mut b, "/x");
        assert_eq!(b.score_for("slaveC").unwrap(), 1);
    }

    #[test]
    fn test_first_matching_rule_only() {
        let cfg = ChainConfig::parse(
            "t",
            "1.filter=matchdir\n\
             1.match=/a/*\n1.assign=slaveA+10\n\
             1.2.match=/a/b/*\n1.2.assign=slaveB+10\n\
             1.3.match=*\n1.3.assign=slaveC+10\n",
        )
        .unwrap();
        let filter = PathMatchFilter::from_props("matchdir", &cfg.filter_props(1)).unwrap();
        assert_eq!(filter.rule_count(), 3);

        let mut b = board();
        run(&filter, &mut b, "/a/b/c");
        assert_eq!(b.score_for("slaveA").unwrap(), 10);
        assert_eq!(b.score_for("slaveB").unwrap(), 0);

        let mut b = board();
        run(&filter, &mut b, "/z");
        assert_eq!(b.score_for("slaveC").unwrap(), 10);
    }

    #[test]
    fn test_from_props_requires_assign() {
        let cfg = ChainConfig::parse("t", "1.filter=matchdir\n1.match=/a/*\n").unwrap();
        assert!(PathMatchFilter::from_props("matchdir", &cfg.filter_props(1)).is_err());
    }
}
