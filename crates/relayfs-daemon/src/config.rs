//! Daemon configuration file.
//!
//! ```toml
//! [selection]
//! dir = "selection"
//!
//! [jobs]
//! sleep_seconds = 10
//!
//! [[nodes]]
//! name = "node1"
//! volumes = ["/srv/node1/disk1", "/srv/node1/disk2"]
//!
//! [[mirror]]
//! pattern = "/incoming/*"
//! replicas = 2
//! destinations = ["node1", "node2"]
//!
//! [[seed_jobs]]
//! path = "/incoming/a.iso"
//! replicas = 1
//! destinations = ["node2"]
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use anyhow::{bail, Context, Result};
use relayfs_jobs::{JobSettings, JobSpec, MirrorRule};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Where chain files live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Directory holding `selection-*.conf` and `volume.conf`.
    pub dir: PathBuf,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/etc/relayfs/selection"),
        }
    }
}

/// One storage node of the local cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node name.
    pub name: String,
    /// Volume directories.
    pub volumes: Vec<PathBuf>,
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Chain file location.
    pub selection: SelectionConfig,
    /// Scheduler settings.
    pub jobs: JobSettings,
    /// Nodes of the local cluster.
    pub nodes: Vec<NodeConfig>,
    /// Post-upload mirror rules.
    pub mirror: Vec<MirrorRule>,
    /// Jobs submitted at startup.
    pub seed_jobs: Vec<JobSpec>,
}

impl DaemonConfig {
    /// Read a `.toml` or `.json` file and resolve relative paths.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        let mut config: DaemonConfig = match ext.to_lowercase().as_str() {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("invalid TOML in {}", path.display()))?,
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("invalid JSON in {}", path.display()))?,
            _ => bail!("unsupported config file extension: {}", ext),
        };
        if let Some(base) = path.parent() {
            config.resolve_relative(base);
        }
        Ok(config)
    }

    fn resolve_relative(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.selection.dir);
        for node in &mut self.nodes {
            node.volumes.iter_mut().for_each(resolve);
        }
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        self.jobs.validate()?;
        let mut names = HashSet::new();
        for node in &self.nodes {
            if node.name.trim().is_empty() {
                bail!("node with an empty name");
            }
            if !names.insert(node.name.as_str()) {
                bail!("node '{}' defined twice", node.name);
            }
            if node.volumes.is_empty() {
                bail!("node '{}' has no volumes", node.name);
            }
        }
        let targets = self
            .mirror
            .iter()
            .map(|r| (format!("mirror rule '{}'", r.pattern), &r.destinations))
            .chain(
                self.seed_jobs
                    .iter()
                    .map(|j| (format!("seed job '{}'", j.path), &j.destinations)),
            );
        for (what, destinations) in targets {
            if let Some(unknown) = destinations.iter().find(|d| !names.contains(d.as_str())) {
                bail!("{} names unknown node '{}'", what, unknown);
            }
        }
        Ok(())
    }
}
