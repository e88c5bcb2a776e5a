//! Node Selection: the master picking a storage node.
//!
//! Four chains are kept, one per purpose, and replaced together on reload.

use crate::candidate::{Direction, Node};
use crate::chain::FilterChain;
use crate::config::ChainConfig;
use crate::engine::ChainSlot;
use crate::error::SelectResult;
use crate::filter::SelectionContext;
use crate::registry::FilterRegistry;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Purpose of a node selection call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainKind {
    /// Client upload: any available node may receive.
    Upload,
    /// Client download: one of the file's holders sends.
    Download,
    /// Scheduler: node sending a replica.
    JobSource,
    /// Scheduler: node receiving a replica.
    JobDestination,
}

impl ChainKind {
    /// All kinds, in load order.
    pub const ALL: [ChainKind; 4] = [
        ChainKind::Upload,
        ChainKind::Download,
        ChainKind::JobSource,
        ChainKind::JobDestination,
    ];

    /// Chain file name inside the selection directory.
    pub fn file_name(self) -> &'static str {
        match self {
            ChainKind::Upload => "selection-up.conf",
            ChainKind::Download => "selection-down.conf",
            ChainKind::JobSource => "selection-jobdown.conf",
            ChainKind::JobDestination => "selection-jobup.conf",
        }
    }

    /// Direction seen from the winning node.
    pub fn direction(self) -> Direction {
        match self {
            ChainKind::Upload | ChainKind::JobDestination => Direction::Receiving,
            ChainKind::Download | ChainKind::JobSource => Direction::Sending,
        }
    }
}

/// The four node chains, published as one unit.
#[derive(Debug)]
pub struct NodeChains {
    upload: FilterChain<Node>,
    download: FilterChain<Node>,
    job_source: FilterChain<Node>,
    job_destination: FilterChain<Node>,
}

impl NodeChains {
    /// Four empty chains.
    pub fn empty() -> Self {
        Self {
            upload: FilterChain::empty(ChainKind::Upload.file_name()),
            download: FilterChain::empty(ChainKind::Download.file_name()),
            job_source: FilterChain::empty(ChainKind::JobSource.file_name()),
            job_destination: FilterChain::empty(ChainKind::JobDestination.file_name()),
        }
    }

    /// Chain for `kind`.
    pub fn get(&self, kind: ChainKind) -> &FilterChain<Node> {
        match kind {
            ChainKind::Upload => &self.upload,
            ChainKind::Download => &self.download,
            ChainKind::JobSource => &self.job_source,
            ChainKind::JobDestination => &self.job_destination,
        }
    }
}

/// Node Selection engine.
pub struct NodeSelection {
    dir: Option<PathBuf>,
    registry: FilterRegistry<Node>,
    chains: ChainSlot<NodeChains>,
}

impl NodeSelection {
    /// Engine reading its chain files from `dir`. Chains start empty until
    /// [`reload`](Self::reload) is called.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            registry: FilterRegistry::nodes(),
            chains: ChainSlot::new(NodeChains::empty()),
        }
    }

    /// Engine with explicit chains and no backing directory.
    pub fn with_chains(chains: NodeChains) -> Self {
        Self {
            dir: None,
            registry: FilterRegistry::nodes(),
            chains: ChainSlot::new(chains),
        }
    }

    /// Directory holding the chain files, if any.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Build all four chains from `configs` without publishing them.
    pub fn build(&self, configs: [&ChainConfig; 4]) -> SelectResult<NodeChains> {
        let [up, down, jobsrc, jobdst] = configs;
        Ok(NodeChains {
            upload: self.registry.build(up)?,
            download: self.registry.build(down)?,
            job_source: self.registry.build(jobsrc)?,
            job_destination: self.registry.build(jobdst)?,
        })
    }

    /// Publish chains built elsewhere.
    pub fn publish(&self, chains: NodeChains) {
        for kind in ChainKind::ALL {
            info!(
                chain = kind.file_name(),
                filters = ?chains.get(kind).filter_names(),
                "node chain loaded"
            );
        }
        self.chains.publish(chains);
    }

    /// Read every chain file and build the four chains without publishing
    /// them. Without a directory the chains are empty.
    pub fn prepare(&self) -> SelectResult<NodeChains> {
        let Some(dir) = self.dir.as_deref() else {
            return Ok(NodeChains::empty());
        };
        let configs = Self::load_configs(dir)?;
        let [a, b, c, d] = &configs;
        self.build([a, b, c, d])
    }

    /// Read every chain file and publish the four chains together. Any
    /// error leaves the previous chains active.
    pub fn reload(&self) -> SelectResult<()> {
        match self.prepare() {
            Ok(chains) => {
                self.publish(chains);
                Ok(())
            }
            Err(e) => {
                error!(dir = ?self.dir, error = %e, "node chain reload failed, keeping previous chains");
                Err(e)
            }
        }
    }

    fn load_configs(dir: &Path) -> SelectResult<[ChainConfig; 4]> {
        Ok([
            ChainConfig::load(&dir.join(ChainKind::Upload.file_name()))?,
            ChainConfig::load(&dir.join(ChainKind::Download.file_name()))?,
            ChainConfig::load(&dir.join(ChainKind::JobSource.file_name()))?,
            ChainConfig::load(&dir.join(ChainKind::JobDestination.file_name()))?,
        ])
    }

    /// Run the `kind` chain. Unreachable nodes are dropped before scoring.
    pub fn select(
        &self,
        kind: ChainKind,
        candidates: impl IntoIterator<Item = Node>,
        ctx: &SelectionContext,
    ) -> SelectResult<Node> {
        let chains = self.chains.load();
        let reachable = candidates.into_iter().filter(|n| {
            if !n.is_available() {
                debug!(node = %n.name, "skipping unreachable node");
            }
            n.is_available()
        });
        let winner = chains.get(kind).select(reachable, ctx)?;
        debug!(
            chain = kind.file_name(),
            path = %ctx.path,
            node = %winner.name,
            "selected node"
        );
        Ok(winner)
    }

    /// Node to receive a client upload.
    pub fn select_for_upload(
        &self,
        nodes: impl IntoIterator<Item = Node>,
        ctx: &SelectionContext,
    ) -> SelectResult<Node> {
        self.select(ChainKind::Upload, nodes, ctx)
    }

    /// Holder to serve a client download.
    pub fn select_for_download(
        &self,
        holders: impl IntoIterator<Item = Node>,
        ctx: &SelectionContext,
    ) -> SelectResult<Node> {
        self.select(ChainKind::Download, holders, ctx)
    }

    /// Source of a replication leg: a holder that is not busy.
    pub fn select_job_source(
        &self,
        holders: &[Node],
        busy: &HashSet<String>,
        path: &str,
    ) -> SelectResult<Node> {
        let candidates = holders
            .iter()
            .filter(|n| !busy.contains(&n.name))
            .cloned();
        let ctx = SelectionContext::new(Direction::Sending, path);
        self.select(ChainKind::JobSource, candidates, &ctx)
    }

    /// Destination of a replication leg: a desired destination that is
    /// neither busy nor already holding the file.
    pub fn select_job_destination(
        &self,
        destinations: &[Node],
        holders: &[Node],
        busy: &HashSet<String>,
        path: &str,
        source: &str,
    ) -> SelectResult<Node> {
        let candidates = destinations
            .iter()
            .filter(|n| !busy.contains(&n.name))
            .filter(|n| !holders.iter().any(|h| h.name == n.name))
            .cloned();
        let ctx = SelectionContext::new(Direction::Receiving, path).with_source_node(source);
        self.select(ChainKind::JobDestination, candidates, &ctx)
    }
}
