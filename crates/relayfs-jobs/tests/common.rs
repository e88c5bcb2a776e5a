//! Shared fixtures for relayfs-jobs integration tests.

#![allow(dead_code)]

use relayfs_jobs::{JobManager, JobQueue, JobScheduler, JobSettings, MemoryCluster};
use relayfs_select::{ChainConfig, NodeChains, NodeSelection};
use std::sync::Arc;

pub const MB: u64 = 1 << 20;

/// Cluster with one node per name, each with `free` bytes available.
pub fn cluster(nodes: &[&str], free: u64) -> Arc<MemoryCluster> {
    let c = Arc::new(MemoryCluster::new());
    for n in nodes {
        c.add_node(n, free);
    }
    c
}

/// Node Selection with the given job-destination chain text.
pub fn selection(job_destination: &str) -> NodeSelection {
    let empty = ChainConfig::default();
    let dst = ChainConfig::parse("selection-jobup.conf", job_destination).unwrap();
    let selection = NodeSelection::with_chains(NodeChains::empty());
    let chains = selection.build([&empty, &empty, &empty, &dst]).unwrap();
    selection.publish(chains);
    selection
}

/// Manager wired to `cluster` for every collaborator.
pub fn manager(cluster: &Arc<MemoryCluster>, selection: NodeSelection) -> JobManager {
    JobManager::new(Arc::new(JobScheduler::new(
        Arc::new(JobQueue::new()),
        Arc::new(selection),
        cluster.clone(),
        cluster.clone(),
        cluster.clone(),
        JobSettings::default(),
    )))
}
