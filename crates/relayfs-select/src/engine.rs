//! Generic selection engine: one published chain, rebuilt wholesale on reload.

use crate::candidate::Candidate;
use crate::chain::FilterChain;
use crate::config::ChainConfig;
use crate::error::SelectResult;
use crate::filter::SelectionContext;
use crate::registry::FilterRegistry;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// A published immutable value. Readers clone the `Arc` and never see a
/// partially built replacement.
#[derive(Debug)]
pub struct ChainSlot<T> {
    current: RwLock<Arc<T>>,
}

impl<T> ChainSlot<T> {
    /// Slot holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
        }
    }

    /// Current value.
    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.current.read())
    }

    /// Replace the current value. In-flight readers keep the old one.
    pub fn publish(&self, value: T) {
        *self.current.write() = Arc::new(value);
    }
}

/// Runs the current chain over a fresh ScoreBoard per call.
pub struct SelectionEngine<C: Candidate> {
    label: &'static str,
    registry: FilterRegistry<C>,
    chain: ChainSlot<FilterChain<C>>,
}

impl<C: Candidate> SelectionEngine<C> {
    /// Engine with an empty chain.
    pub fn new(label: &'static str, registry: FilterRegistry<C>) -> Self {
        Self {
            label,
            registry,
            chain: ChainSlot::new(FilterChain::empty(label)),
        }
    }

    /// Name used in log output.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// The active chain.
    pub fn chain(&self) -> Arc<FilterChain<C>> {
        self.chain.load()
    }

    /// Filter table used on reload.
    pub fn registry(&self) -> &FilterRegistry<C> {
        &self.registry
    }

    /// Pick the best of `candidates` for `ctx`.
    pub fn select(
        &self,
        candidates: impl IntoIterator<Item = C>,
        ctx: &SelectionContext,
    ) -> SelectResult<C> {
        let chain = self.chain.load();
        let winner = chain.select(candidates, ctx)?;
        debug!(
            engine = self.label,
            path = %ctx.path,
            winner = winner.name(),
            "selected candidate"
        );
        Ok(winner)
    }

    /// Build a chain from `config` and publish it. On error the previous
    /// chain stays active.
    pub fn reload_from(&self, config: &ChainConfig) -> SelectResult<()> {
        match self.registry.build(config) {
            Ok(chain) => {
                self.publish(chain);
                Ok(())
            }
            Err(e) => {
                error!(engine = self.label, error = %e, "filter chain reload failed, keeping previous chain");
                Err(e)
            }
        }
    }

    /// Load `path` and publish the resulting chain.
    pub fn reload_file(&self, path: &Path) -> SelectResult<()> {
        let config = ChainConfig::load(path).map_err(|e| {
            error!(engine = self.label, path = %path.display(), error = %e, "cannot read chain file");
            e
        })?;
        self.reload_from(&config)
    }

    /// Build a chain from `path` without publishing it.
    pub fn prepare_file(&self, path: &Path) -> SelectResult<FilterChain<C>> {
        self.registry.build(&ChainConfig::load(path)?)
    }

    /// Publish a chain built with [`prepare_file`](Self::prepare_file).
    pub fn publish(&self, chain: FilterChain<C>) {
        info!(
            engine = self.label,
            source = chain.source(),
            filters = chain.len(),
            "filter chain loaded"
        );
        self.chain.publish(chain);
    }
}
