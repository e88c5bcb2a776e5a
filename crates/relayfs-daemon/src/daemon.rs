//! Daemon wiring: local cluster, selection engines, scheduler and reload.

use crate::config::{DaemonConfig, NodeConfig};
use crate::local::LocalCluster;
use anyhow::{Context, Result};
use relayfs_jobs::{
    FileIndex, JobManager, JobQueue, JobScheduler, JobSettings, JobSpec, MirrorRule, MirrorRules,
    NodeRoster,
};
use relayfs_select::{
    ChainKind, Direction, FilterChain, Node, NodeChains, NodeSelection, SelectionContext, Volume,
    VolumeSelection, VOLUME_CHAIN_FILE,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Everything a configuration builds before it goes live.
struct Prepared {
    node_chains: NodeChains,
    volume_chain: FilterChain<Volume>,
    settings: JobSettings,
}

/// Result of a selection dry run.
#[derive(Debug, Clone)]
pub struct Placement {
    /// Winning node.
    pub node: Node,
    /// Volume on the winning node, for uploads.
    pub volume: Option<Volume>,
}

/// Filters loaded for one chain file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSummary {
    /// Chain file.
    pub source: String,
    /// Filter names in order.
    pub filters: Vec<&'static str>,
}

/// A running relayfs daemon.
pub struct Daemon {
    config_path: PathBuf,
    selection_dir: PathBuf,
    nodes: Vec<NodeConfig>,
    mirror_rules: Vec<MirrorRule>,
    cluster: Arc<LocalCluster>,
    node_selection: Arc<NodeSelection>,
    volume_selection: Arc<VolumeSelection>,
    manager: JobManager,
    mirror: MirrorRules,
}

impl Daemon {
    /// Build the daemon from `config`, read from `config_path`. Chain errors
    /// are fatal here; later reloads keep the running state instead.
    pub fn new(config_path: impl Into<PathBuf>, config: &DaemonConfig) -> Result<Self> {
        let node_selection = Arc::new(NodeSelection::new(&config.selection.dir));
        let volume_selection = Arc::new(VolumeSelection::new(
            config.selection.dir.join(VOLUME_CHAIN_FILE),
        ));
        let prepared = prepare(&node_selection, &volume_selection, config)?;
        node_selection.publish(prepared.node_chains);
        volume_selection.publish(prepared.volume_chain);

        let cluster = Arc::new(LocalCluster::new(
            &config.nodes,
            Arc::clone(&volume_selection),
        ));
        let scheduler = Arc::new(JobScheduler::new(
            Arc::new(JobQueue::new()),
            Arc::clone(&node_selection),
            cluster.clone(),
            cluster.clone(),
            cluster.clone(),
            prepared.settings,
        ));
        let mirror = MirrorRules::new(config.mirror.clone()).context("invalid mirror rules")?;

        info!(
            nodes = config.nodes.len(),
            mirror_rules = mirror.len(),
            selection_dir = %config.selection.dir.display(),
            "daemon configured"
        );
        Ok(Self {
            config_path: config_path.into(),
            selection_dir: config.selection.dir.clone(),
            nodes: config.nodes.clone(),
            mirror_rules: config.mirror.clone(),
            cluster,
            node_selection,
            volume_selection,
            manager: JobManager::new(scheduler),
            mirror,
        })
    }

    /// Administrative job surface.
    pub fn manager(&self) -> &JobManager {
        &self.manager
    }

    /// The local cluster.
    pub fn cluster(&self) -> &Arc<LocalCluster> {
        &self.cluster
    }

    /// Node Selection engine.
    pub fn node_selection(&self) -> &Arc<NodeSelection> {
        &self.node_selection
    }

    /// Queue `jobs`, logging the ones that are rejected. Returns how many
    /// were queued.
    pub async fn seed(&self, jobs: &[JobSpec]) -> usize {
        let mut queued = 0;
        for spec in jobs {
            match self.manager.add_job(spec.clone()).await {
                Ok(job) if job.state.is_terminal() => {
                    info!(path = %spec.path, "seed job already satisfied");
                }
                Ok(job) => {
                    info!(job = job.index, path = %spec.path, "seed job queued");
                    queued += 1;
                }
                Err(e) => warn!(path = %spec.path, error = %e, "seed job rejected"),
            }
        }
        queued
    }

    /// Run the mirror hook over every file already on disk.
    pub async fn mirror_existing(&self) -> Result<usize> {
        if self.mirror.is_empty() {
            return Ok(0);
        }
        let files = self
            .cluster
            .scan_files()
            .await
            .context("cannot scan volumes")?;
        let mut queued = 0;
        for path in &files {
            if self.mirror.upload_complete(&self.manager, path).await.is_some() {
                queued += 1;
            }
        }
        info!(files = files.len(), queued, "startup mirror scan finished");
        Ok(queued)
    }

    /// Reread the configuration file and publish its chains and settings
    /// together. Any error leaves the running state untouched.
    pub fn reload(&self) -> Result<()> {
        let config = DaemonConfig::from_file(&self.config_path)?;
        let prepared = prepare(&self.node_selection, &self.volume_selection, &config)?;

        if config.selection.dir != self.selection_dir {
            warn!(
                configured = %config.selection.dir.display(),
                active = %self.selection_dir.display(),
                "selection directory changes take effect on restart"
            );
        }
        if config.nodes != self.nodes || config.mirror != self.mirror_rules {
            warn!("node and mirror rule changes take effect on restart");
        }

        self.manager.apply_settings(prepared.settings)?;
        self.node_selection.publish(prepared.node_chains);
        self.volume_selection.publish(prepared.volume_chain);
        info!(config = %self.config_path.display(), "configuration reloaded");
        Ok(())
    }

    /// Run one selection against the live cluster without moving data.
    pub async fn select(&self, path: &str, direction: Direction) -> Result<Placement> {
        let ctx = SelectionContext::new(direction, path);
        match direction {
            Direction::Receiving => {
                let nodes = self.cluster.available_nodes().await?;
                let node = self.node_selection.select_for_upload(nodes, &ctx)?;
                let volumes = self.cluster.volumes(&node.name).await?;
                let volume = self.volume_selection.select(volumes, path)?;
                Ok(Placement {
                    node,
                    volume: Some(volume),
                })
            }
            Direction::Sending => {
                let holders = self.cluster.available_holding_nodes(path).await?;
                let node = self.node_selection.select_for_download(holders, &ctx)?;
                Ok(Placement { node, volume: None })
            }
        }
    }

    /// Drive the scheduler until `shutdown` fires, reloading on SIGHUP.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let scheduler = tokio::spawn(Arc::clone(self.manager.scheduler()).run(shutdown.clone()));

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut hangup = signal(SignalKind::hangup()).context("cannot install SIGHUP handler")?;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    Some(()) = hangup.recv() => {
                        info!("SIGHUP received, reloading configuration");
                        if let Err(e) = self.reload() {
                            error!(error = %e, "reload failed, keeping previous configuration");
                        }
                    }
                }
            }
        }
        #[cfg(not(unix))]
        shutdown.cancelled().await;

        scheduler.await.context("scheduler task failed")?;
        Ok(())
    }
}

fn prepare(
    node_selection: &NodeSelection,
    volume_selection: &VolumeSelection,
    config: &DaemonConfig,
) -> Result<Prepared> {
    config.validate()?;
    let node_chains = node_selection.prepare().with_context(|| {
        format!(
            "cannot build node chains from {}",
            node_selection
                .dir()
                .map(|d| d.display().to_string())
                .unwrap_or_default()
        )
    })?;
    let volume_chain = volume_selection
        .prepare()
        .context("cannot build volume chain")?;
    Ok(Prepared {
        node_chains,
        volume_chain,
        settings: config.jobs.clone(),
    })
}

/// Build every chain `config` names and validate it, without starting
/// anything.
pub fn check(config: &DaemonConfig) -> Result<Vec<ChainSummary>> {
    let node_selection = NodeSelection::new(&config.selection.dir);
    let volume_selection = VolumeSelection::new(config.selection.dir.join(VOLUME_CHAIN_FILE));
    let prepared = prepare(&node_selection, &volume_selection, config)?;
    MirrorRules::new(config.mirror.clone()).context("invalid mirror rules")?;

    let mut summaries: Vec<ChainSummary> = ChainKind::ALL
        .iter()
        .map(|kind| {
            let chain = prepared.node_chains.get(*kind);
            ChainSummary {
                source: chain.source().to_string(),
                filters: chain.filter_names(),
            }
        })
        .collect();
    summaries.push(ChainSummary {
        source: prepared.volume_chain.source().to_string(),
        filters: prepared.volume_chain.filter_names(),
    });
    Ok(summaries)
}

/// Load, validate and return the configuration at `path`.
pub fn load_config(path: &Path) -> Result<DaemonConfig> {
    let config = DaemonConfig::from_file(path)?;
    config.validate()?;
    Ok(config)
}
