//! Tagged filter factories.
//!
//! Each engine has a table mapping a configuration name to a constructor.
//! Names are matched case-insensitively; an unknown name fails the whole chain.

use crate::candidate::{Candidate, Node, Volume};
use crate::chain::FilterChain;
use crate::config::{ChainConfig, FilterProps};
use crate::error::{SelectError, SelectResult};
use crate::filter::Filter;
use crate::filters::{
    BandwidthFilter, CapacityFilter, CeilingFilter, CycleFilter, MaxTransfersFilter,
    PathMatchFilter, PriorityFilter,
};

/// Constructor for one filter kind.
pub type FilterFactory<C> = fn(&FilterProps<'_>) -> SelectResult<Box<dyn Filter<C>>>;

/// Name → constructor table.
pub struct FilterRegistry<C: Candidate> {
    entries: Vec<(&'static str, FilterFactory<C>)>,
}

impl<C: Candidate> FilterRegistry<C> {
    /// Table with no entries.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add (or replace) the constructor for `name`.
    pub fn register(mut self, name: &'static str, factory: FilterFactory<C>) -> Self {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.entries.push((name, factory));
        self
    }

    /// Registered names.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(n, _)| *n).collect()
    }

    fn lookup(&self, name: &str) -> Option<FilterFactory<C>> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, f)| *f)
    }

    /// Build a complete chain from `config`. Nothing is returned unless every
    /// filter constructs.
    pub fn build(&self, config: &ChainConfig) -> SelectResult<FilterChain<C>> {
        let mut filters = Vec::new();
        for (position, name) in config.filter_names() {
            let factory = self
                .lookup(name)
                .ok_or_else(|| SelectError::UnknownFilter {
                    name: name.to_string(),
                    position,
                })?;
            filters.push(factory(&config.filter_props(position))?);
        }
        Ok(FilterChain::new(config.source(), filters))
    }
}

fn capacity<C: Candidate>(props: &FilterProps<'_>) -> SelectResult<Box<dyn Filter<C>>> {
    Ok(Box::new(CapacityFilter::from_props(props)?))
}

fn bandwidth<C: Candidate>(props: &FilterProps<'_>) -> SelectResult<Box<dyn Filter<C>>> {
    Ok(Box::new(BandwidthFilter::from_props(props)?))
}

fn ceiling<C: Candidate>(props: &FilterProps<'_>) -> SelectResult<Box<dyn Filter<C>>> {
    Ok(Box::new(CeilingFilter::from_props(props)?))
}

fn matchdir<C: Candidate>(props: &FilterProps<'_>) -> SelectResult<Box<dyn Filter<C>>> {
    Ok(Box::new(PathMatchFilter::from_props("matchdir", props)?))
}

fn assign<C: Candidate>(props: &FilterProps<'_>) -> SelectResult<Box<dyn Filter<C>>> {
    Ok(Box::new(PathMatchFilter::from_props("assign", props)?))
}

fn cycle<C: Candidate>(_props: &FilterProps<'_>) -> SelectResult<Box<dyn Filter<C>>> {
    Ok(Box::new(CycleFilter::new()))
}

fn priority<C: Candidate>(props: &FilterProps<'_>) -> SelectResult<Box<dyn Filter<C>>> {
    Ok(Box::new(PriorityFilter::from_props(props)?))
}

fn max_transfers<C: Candidate>(props: &FilterProps<'_>) -> SelectResult<Box<dyn Filter<C>>> {
    Ok(Box::new(MaxTransfersFilter::from_props(props)?))
}

impl FilterRegistry<Node> {
    /// Filters available to Node Selection.
    pub fn nodes() -> Self {
        Self::empty()
            .register("minfreespace", capacity)
            .register("bandwidth", bandwidth)
            .register("maxbandwidth", ceiling)
            .register("matchdir", matchdir)
            .register("cycle", cycle)
            .register("maxtransfers", max_transfers)
            .register("priority", priority)
    }
}

impl FilterRegistry<Volume> {
    /// Filters available to Volume Selection.
    pub fn volumes() -> Self {
        Self::empty()
            .register("minfreespace", capacity)
            .register("cycle", cycle)
            .register("assign", assign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_registry_names() {
        let names = FilterRegistry::<Node>::nodes().names();
        for expected in ["minfreespace", "bandwidth", "maxbandwidth", "matchdir", "cycle"] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn test_volume_registry_is_disjoint_set() {
        let names = FilterRegistry::<Volume>::volumes().names();
        assert_eq!(names, vec!["minfreespace", "cycle", "assign"]);
    }

    #[test]
    fn test_build_case_insensitive() {
        let cfg = ChainConfig::parse(
            "up",
            "1.filter=MinFreeSpace\n1.remaining=1MB\n2.filter=Cycle\n",
        )
        .unwrap();
        let chain = FilterRegistry::<Node>::nodes().build(&cfg).unwrap();
        assert_eq!(chain.filter_names(), vec!["minfreespace", "cycle"]);
        assert_eq!(chain.source(), "up");
    }

    #[test]
    fn test_unknown_filter_fails() {
        let cfg = ChainConfig::parse("up", "1.filter=cycle\n2.filter=bogus\n").unwrap();
        let err = FilterRegistry::<Node>::nodes().build(&cfg).unwrap_err();
        match err {
            SelectError::UnknownFilter { name, position } => {
                assert_eq!(name, "bogus");
                assert_eq!(position, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_node_only_filter_rejected_for_volumes() {
        let cfg = ChainConfig::parse("vol", "1.filter=bandwidth\n").unwrap();
        assert!(FilterRegistry::<Volume>::volumes().build(&cfg).is_err());
    }

    #[test]
    fn test_bad_filter_props_fail_chain() {
        let cfg = ChainConfig::parse("up", "1.filter=bandwidth\n1.multiplier=*x\n").unwrap();
        assert!(matches!(
            FilterRegistry::<Node>::nodes().build(&cfg),
            Err(SelectError::Config { .. })
        ));
    }
}
