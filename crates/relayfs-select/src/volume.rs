//! Volume Selection: a node picking one of its local storage roots.

use crate::candidate::{Direction, Volume};
use crate::chain::FilterChain;
use crate::engine::SelectionEngine;
use crate::error::SelectResult;
use crate::filter::SelectionContext;
use crate::registry::FilterRegistry;
use std::path::{Path, PathBuf};

/// Chain file name for Volume Selection.
pub const VOLUME_CHAIN_FILE: &str = "volume.conf";

/// Volume Selection engine.
pub struct VolumeSelection {
    path: Option<PathBuf>,
    engine: SelectionEngine<Volume>,
}

impl VolumeSelection {
    /// Engine reading its chain from `path`; empty until reloaded.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            engine: SelectionEngine::new("volume", FilterRegistry::volumes()),
        }
    }

    /// Engine with no chain file: the first configured root always wins.
    pub fn unconfigured() -> Self {
        Self {
            path: None,
            engine: SelectionEngine::new("volume", FilterRegistry::volumes()),
        }
    }

    /// Chain file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Underlying engine.
    pub fn engine(&self) -> &SelectionEngine<Volume> {
        &self.engine
    }

    /// Reread the chain file. On error the previous chain stays active.
    pub fn reload(&self) -> SelectResult<()> {
        match &self.path {
            Some(path) => self.engine.reload_file(path),
            None => Ok(()),
        }
    }

    /// Build the chain from the chain file without publishing it.
    pub fn prepare(&self) -> SelectResult<FilterChain<Volume>> {
        match &self.path {
            Some(path) => self.engine.prepare_file(path),
            None => Ok(FilterChain::empty("volume")),
        }
    }

    /// Publish a chain built with [`prepare`](Self::prepare).
    pub fn publish(&self, chain: FilterChain<Volume>) {
        self.engine.publish(chain);
    }

    /// Root that should receive `path`.
    pub fn select(
        &self,
        volumes: impl IntoIterator<Item = Volume>,
        path: &str,
    ) -> SelectResult<Volume> {
        let ctx = SelectionContext::new(Direction::Receiving, path);
        self.engine.select(volumes, &ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::LiveStatus;

    fn vol(name: &str, available: u64) -> Volume {
        Volume::new(name, format!("/srv/{name}"), LiveStatus::idle(available, 1 << 30))
    }

    #[test]
    fn test_assign_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join(VOLUME_CHAIN_FILE);
        std::fs::write(
            &conf,
            "1.filter=assign\n1.match=/mp3/*\n1.assign=disk2+100\n2.filter=cycle\n",
        )
        .unwrap();
        let sel = VolumeSelection::new(&conf);
        sel.reload().unwrap();

        let vols = || vec![vol("disk1", 100), vol("disk2", 100)];
        assert_eq!(sel.select(vols(), "/mp3/song.mp3").unwrap().name, "disk2");
        // Off-rule paths rotate.
        let a = sel.select(vols(), "/iso/a.iso").unwrap().name;
        let b = sel.select(vols(), "/iso/b.iso").unwrap().name;
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_node_only_filters() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join(VOLUME_CHAIN_FILE);
        std::fs::write(&conf, "1.filter=matchdir\n1.match=*\n1.assign=a+1\n").unwrap();
        let sel = VolumeSelection::new(&conf);
        assert!(sel.reload().is_err());
        assert!(sel.engine().chain().is_empty());
    }

    #[test]
    fn test_full_volume_removed() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join(VOLUME_CHAIN_FILE);
        std::fs::write(
            &conf,
            "1.filter=minfreespace\n1.remaining=1KB\n1.multiplier=0\n",
        )
        .unwrap();
        let sel = VolumeSelection::new(&conf);
        sel.reload().unwrap();
        let winner = sel
            .select(vec![vol("full", 10), vol("roomy", 4096)], "/x")
            .unwrap();
        assert_eq!(winner.name, "roomy");
    }
}
