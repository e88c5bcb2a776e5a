//! A cluster whose nodes are directories on this host.
//!
//! Each node owns one or more volume directories. The virtual path `/a/b`
//! is stored as `<volume>/a/b` on whichever volume received it, and a node
//! holds a file when any of its volumes has it. Transfers copy between
//! volume directories in fixed-size chunks.

use crate::config::NodeConfig;
use crate::disk::disk_usage_async;
use async_trait::async_trait;
use dashmap::DashMap;
use relayfs_jobs::{
    FileIndex, JobError, JobResult, NodeRoster, TransferAgent, TransferOutcome, TransferProgress,
    TransferRequest,
};
use relayfs_select::{LiveStatus, Node, Volume, VolumeSelection};
use std::collections::BTreeSet;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const CHUNK_SIZE: usize = 64 * 1024;
const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug, Clone)]
struct LocalNode {
    name: String,
    volumes: Vec<PathBuf>,
}

/// Live counters for one node, maintained by running legs.
#[derive(Debug, Default, Clone, Copy)]
struct Activity {
    transfers_in: u32,
    transfers_out: u32,
    throughput_in_bps: u64,
    throughput_out_bps: u64,
    last_activity_ms: u64,
}

/// Nodes backed by local directories.
pub struct LocalCluster {
    nodes: Vec<LocalNode>,
    activity: DashMap<String, Activity>,
    volume_selection: Arc<VolumeSelection>,
}

impl LocalCluster {
    /// Cluster over `nodes`; receiving nodes place files with `volume_selection`.
    pub fn new(nodes: &[NodeConfig], volume_selection: Arc<VolumeSelection>) -> Self {
        Self {
            nodes: nodes
                .iter()
                .map(|n| LocalNode {
                    name: n.name.clone(),
                    volumes: n.volumes.clone(),
                })
                .collect(),
            activity: DashMap::new(),
            volume_selection,
        }
    }

    /// Volume Selection used for incoming copies.
    pub fn volume_selection(&self) -> &Arc<VolumeSelection> {
        &self.volume_selection
    }

    /// Configured node names, in configuration order.
    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    fn local_node(&self, name: &str) -> JobResult<&LocalNode> {
        self.nodes
            .iter()
            .find(|n| n.name == name)
            .ok_or_else(|| JobError::NodeUnreachable {
                node: name.to_string(),
            })
    }

    /// Current status of `name`, reachable or not.
    pub async fn node(&self, name: &str) -> JobResult<Node> {
        let node = self.local_node(name)?;
        Ok(Node::new(&node.name, self.status(node).await))
    }

    async fn status(&self, node: &LocalNode) -> LiveStatus {
        let mut status = LiveStatus::default();
        for root in &node.volumes {
            if !is_dir(root).await {
                continue;
            }
            status.reachable = true;
            match disk_usage_async(root).await {
                Ok(usage) => {
                    status.available_bytes += usage.available_bytes;
                    status.total_bytes += usage.total_bytes;
                }
                Err(e) => {
                    warn!(node = %node.name, volume = %root.display(), error = %e, "cannot stat volume")
                }
            }
        }
        if let Some(activity) = self.activity.get(&node.name) {
            status.transfers_in = activity.transfers_in;
            status.transfers_out = activity.transfers_out;
            status.throughput_in_bps = activity.throughput_in_bps;
            status.throughput_out_bps = activity.throughput_out_bps;
            status.last_activity_ms = activity.last_activity_ms;
        }
        status
    }

    /// Existing volumes of node `name`, with their own capacity.
    pub async fn volumes(&self, name: &str) -> JobResult<Vec<Volume>> {
        let node = self.local_node(name)?;
        let mut volumes = Vec::new();
        for (i, root) in node.volumes.iter().enumerate() {
            if !is_dir(root).await {
                continue;
            }
            let usage = disk_usage_async(root).await.unwrap_or_default();
            let name = root
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("volume{}", i + 1));
            volumes.push(Volume::new(
                name,
                root.clone(),
                LiveStatus::idle(usage.available_bytes, usage.total_bytes),
            ));
        }
        Ok(volumes)
    }

    async fn locate(&self, node: &LocalNode, rel: &Path) -> Option<PathBuf> {
        for root in &node.volumes {
            let candidate = root.join(rel);
            if is_file(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    /// Virtual paths of every complete file on every volume.
    pub async fn scan_files(&self) -> io::Result<BTreeSet<String>> {
        let mut found = BTreeSet::new();
        for node in &self.nodes {
            for root in &node.volumes {
                if !is_dir(root).await {
                    continue;
                }
                let mut pending = vec![root.clone()];
                while let Some(dir) = pending.pop() {
                    let mut entries = tokio::fs::read_dir(&dir).await?;
                    while let Some(entry) = entries.next_entry().await? {
                        let file_type = entry.file_type().await?;
                        let path = entry.path();
                        if file_type.is_dir() {
                            pending.push(path);
                        } else if file_type.is_file() && !is_partial(&path) {
                            if let Some(v) = virtual_path(root, &path) {
                                found.insert(v);
                            }
                        }
                    }
                }
            }
        }
        Ok(found)
    }

    async fn remove_copies(&self, node: &LocalNode, rel: &Path) -> JobResult<usize> {
        let mut removed = 0;
        for root in &node.volumes {
            let target = root.join(rel);
            for file in [partial_path(&target), target] {
                match tokio::fs::remove_file(&file).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(transfer_error(&node.name, e)),
                }
            }
        }
        Ok(removed)
    }

    /// Checksum both sides when the destination already has the file. The
    /// copy is left alone; the caller decides whether to keep it.
    async fn compare_existing(
        &self,
        source: &Path,
        existing: &Path,
        request: &TransferRequest,
    ) -> JobResult<TransferOutcome> {
        let started = Instant::now();
        let source_crc = file_crc(source).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                file_gone(&request.path)
            } else {
                transfer_error(&request.source, e)
            }
        })?;
        let destination_crc = file_crc(existing)
            .await
            .map_err(|e| transfer_error(&request.destination, e))?;
        debug!(
            path = %request.path,
            destination = %request.destination,
            copy = %existing.display(),
            matches = source_crc == destination_crc,
            "destination already holds a copy"
        );
        Ok(TransferOutcome {
            bytes: 0,
            elapsed: started.elapsed(),
            source_checksum: Some(source_crc),
            destination_checksum: Some(destination_crc),
            existing: true,
        })
    }

    async fn copy_chunks(
        &self,
        source: &Path,
        partial: &Path,
        request: &TransferRequest,
        progress: &TransferProgress,
        cancel: &CancellationToken,
        leg: &LegGuard<'_>,
    ) -> JobResult<(u64, u32)> {
        let src_err = |e: io::Error| {
            if e.kind() == io::ErrorKind::NotFound {
                JobError::FileGone {
                    path: request.path.clone(),
                }
            } else {
                transfer_error(&request.source, e)
            }
        };
        let dst_err = |e: io::Error| transfer_error(&request.destination, e);

        if let Some(parent) = partial.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(dst_err)?;
        }
        let mut reader = tokio::fs::File::open(source).await.map_err(src_err)?;
        let mut writer = tokio::fs::File::create(partial).await.map_err(dst_err)?;
        let mut hasher = crc32fast::Hasher::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut bytes = 0u64;
        loop {
            if cancel.is_cancelled() {
                return Err(JobError::Cancelled);
            }
            let n = reader.read(&mut buf).await.map_err(src_err)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            writer.write_all(&buf[..n]).await.map_err(dst_err)?;
            bytes += n as u64;
            progress.advance(n as u64);
            leg.throughput(progress.speed_bps());
        }
        writer.sync_all().await.map_err(dst_err)?;
        Ok((bytes, hasher.finalize()))
    }
}

#[async_trait]
impl NodeRoster for LocalCluster {
    async fn available_nodes(&self) -> JobResult<Vec<Node>> {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let status = self.status(node).await;
            if status.reachable {
                nodes.push(Node::new(&node.name, status));
            } else {
                debug!(node = %node.name, "no volume directory present, node offline");
            }
        }
        Ok(nodes)
    }
}

#[async_trait]
impl FileIndex for LocalCluster {
    async fn holding_nodes(&self, path: &str) -> JobResult<Vec<Node>> {
        let rel = relative(path)?;
        let mut holders = Vec::new();
        for node in &self.nodes {
            if self.locate(node, &rel).await.is_some() {
                holders.push(Node::new(&node.name, self.status(node).await));
            }
        }
        if holders.is_empty() {
            return Err(file_gone(path));
        }
        Ok(holders)
    }

    async fn size(&self, path: &str) -> JobResult<u64> {
        let rel = relative(path)?;
        for node in &self.nodes {
            if let Some(found) = self.locate(node, &rel).await {
                if let Ok(meta) = tokio::fs::metadata(&found).await {
                    return Ok(meta.len());
                }
            }
        }
        Err(file_gone(path))
    }

    async fn add_holder(&self, path: &str, node: &str) -> JobResult<()> {
        let rel = relative(path)?;
        let local = self.local_node(node)?;
        match self.locate(local, &rel).await {
            Some(found) => {
                debug!(path, node, copy = %found.display(), "holder recorded");
                Ok(())
            }
            None => Err(JobError::Transfer {
                node: node.to_string(),
                reason: format!("no copy of {path} after transfer"),
            }),
        }
    }

    async fn remove_holder(&self, path: &str, node: &str) -> JobResult<()> {
        let rel = relative(path)?;
        let local = self.local_node(node)?;
        let removed = self.remove_copies(local, &rel).await?;
        debug!(path, node, removed, "holder forgotten");
        Ok(())
    }
}

#[async_trait]
impl TransferAgent for LocalCluster {
    async fn transfer(
        &self,
        request: &TransferRequest,
        progress: &TransferProgress,
        cancel: &CancellationToken,
    ) -> JobResult<TransferOutcome> {
        let rel = relative(&request.path)?;
        let source = self.local_node(&request.source)?;
        let source_path = self
            .locate(source, &rel)
            .await
            .ok_or_else(|| file_gone(&request.path))?;

        let destination = self.local_node(&request.destination)?;
        if let Some(found) = self.locate(destination, &rel).await {
            return self.compare_existing(&source_path, &found, request).await;
        }

        let volumes = self.volumes(&request.destination).await?;
        if volumes.is_empty() {
            return Err(JobError::NodeUnreachable {
                node: request.destination.clone(),
            });
        }
        let volume = self
            .volume_selection
            .select(volumes, &request.path)
            .map_err(|e| JobError::Transfer {
                node: request.destination.clone(),
                reason: format!("no volume can take the file: {e}"),
            })?;
        let final_path = volume.root.join(&rel);
        let partial = partial_path(&final_path);

        let leg = LegGuard::begin(&self.activity, &request.source, &request.destination);
        let started = Instant::now();
        progress.start();
        let (bytes, source_crc) = match self
            .copy_chunks(&source_path, &partial, request, progress, cancel, &leg)
            .await
        {
            Ok(copied) => copied,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };
        if let Err(e) = tokio::fs::rename(&partial, &final_path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(transfer_error(&request.destination, e));
        }

        let destination_checksum = if request.checksum {
            Some(
                file_crc(&final_path)
                    .await
                    .map_err(|e| transfer_error(&request.destination, e))?,
            )
        } else {
            None
        };
        let outcome = TransferOutcome {
            bytes,
            elapsed: started.elapsed(),
            source_checksum: request.checksum.then_some(source_crc),
            destination_checksum,
            existing: false,
        };
        info!(
            path = %request.path,
            source = %request.source,
            destination = %request.destination,
            volume = %volume.name,
            bytes,
            speed_bps = outcome.speed_bps(),
            "copy written"
        );
        Ok(outcome)
    }

    async fn delete(&self, node: &str, path: &str) -> JobResult<()> {
        let rel = relative(path)?;
        let local = self.local_node(node)?;
        let removed = self.remove_copies(local, &rel).await?;
        debug!(path, node, removed, "copy deleted");
        Ok(())
    }
}

/// Counts one running leg against both nodes until dropped.
struct LegGuard<'a> {
    activity: &'a DashMap<String, Activity>,
    source: &'a str,
    destination: &'a str,
}

impl<'a> LegGuard<'a> {
    fn begin(activity: &'a DashMap<String, Activity>, source: &'a str, destination: &'a str) -> Self {
        touch(activity, source, |a| a.transfers_out += 1);
        touch(activity, destination, |a| a.transfers_in += 1);
        Self {
            activity,
            source,
            destination,
        }
    }

    fn throughput(&self, bps: u64) {
        touch(self.activity, self.source, |a| a.throughput_out_bps = bps);
        touch(self.activity, self.destination, |a| a.throughput_in_bps = bps);
    }
}

impl Drop for LegGuard<'_> {
    fn drop(&mut self) {
        touch(self.activity, self.source, |a| {
            a.transfers_out = a.transfers_out.saturating_sub(1);
            if a.transfers_out == 0 {
                a.throughput_out_bps = 0;
            }
        });
        touch(self.activity, self.destination, |a| {
            a.transfers_in = a.transfers_in.saturating_sub(1);
            if a.transfers_in == 0 {
                a.throughput_in_bps = 0;
            }
        });
    }
}

fn touch(activity: &DashMap<String, Activity>, node: &str, update: impl FnOnce(&mut Activity)) {
    let mut entry = activity.entry(node.to_string()).or_default();
    update(&mut entry);
    entry.last_activity_ms = now_ms();
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Map a virtual path to a path relative to a volume root.
fn relative(path: &str) -> JobResult<PathBuf> {
    let invalid = || JobError::InvalidJob {
        reason: format!("'{path}' is not a plain absolute path"),
    };
    let rel = Path::new(path.strip_prefix('/').ok_or_else(invalid)?);
    if rel.as_os_str().is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(invalid());
    }
    Ok(rel.to_path_buf())
}

fn virtual_path(root: &Path, file: &Path) -> Option<String> {
    let rel = file.strip_prefix(root).ok()?;
    Some(format!("/{}", rel.to_str()?))
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

fn is_partial(path: &Path) -> bool {
    path.to_str().is_some_and(|p| p.ends_with(PARTIAL_SUFFIX))
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

async fn file_crc(path: &Path) -> io::Result<u32> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(hasher.finalize());
        }
        hasher.update(&buf[..n]);
    }
}

fn file_gone(path: &str) -> JobError {
    JobError::FileGone {
        path: path.to_string(),
    }
}

fn transfer_error(node: &str, e: io::Error) -> JobError {
    JobError::Transfer {
        node: node.to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cluster(dir: &TempDir) -> LocalCluster {
        let root = dir.path();
        for v in ["n1/disk1", "n1/disk2", "n2/disk1"] {
            std::fs::create_dir_all(root.join(v)).unwrap();
        }
        let nodes = vec![
            NodeConfig {
                name: "n1".into(),
                volumes: vec![root.join("n1/disk1"), root.join("n1/disk2")],
            },
            NodeConfig {
                name: "n2".into(),
                volumes: vec![root.join("n2/disk1")],
            },
            NodeConfig {
                name: "n3".into(),
                volumes: vec![root.join("n3/disk1")],
            },
        ];
        LocalCluster::new(&nodes, Arc::new(VolumeSelection::unconfigured()))
    }

    fn put(dir: &TempDir, volume: &str, rel: &str, data: &[u8]) {
        let path = dir.path().join(volume).join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    fn request(path: &str, source: &str, destination: &str) -> TransferRequest {
        TransferRequest {
            path: path.into(),
            source: source.into(),
            destination: destination.into(),
            secure: false,
            checksum: true,
        }
    }

    #[test]
    fn test_relative_paths() {
        assert_eq!(relative("/a/b.iso").unwrap(), PathBuf::from("a/b.iso"));
        assert!(relative("a/b").is_err());
        assert!(relative("/").is_err());
        assert!(relative("/a/../../etc/passwd").is_err());
    }

    mod index {
        use super::*;

        #[tokio::test]
        async fn test_node_without_volumes_is_offline() {
            let dir = tempfile::tempdir().unwrap();
            let c = cluster(&dir);
            let names: Vec<String> = c
                .available_nodes()
                .await
                .unwrap()
                .into_iter()
                .map(|n| n.name)
                .collect();
            assert_eq!(names, vec!["n1", "n2"]);
            assert!(!c.node("n3").await.unwrap().is_available());
            assert!(c.node("n1").await.unwrap().status.total_bytes > 0);
        }

        #[tokio::test]
        async fn test_holders_and_size() {
            let dir = tempfile::tempdir().unwrap();
            let c = cluster(&dir);
            put(&dir, "n1/disk2", "iso/a.iso", b"hello");
            let holders = c.holding_nodes("/iso/a.iso").await.unwrap();
            assert_eq!(holders.len(), 1);
            assert_eq!(holders[0].name, "n1");
            assert_eq!(c.size("/iso/a.iso").await.unwrap(), 5);
            assert!(c.holding_nodes("/iso/b.iso").await.unwrap_err().is_file_gone());
        }

        #[tokio::test]
        async fn test_scan_skips_partial_copies() {
            let dir = tempfile::tempdir().unwrap();
            let c = cluster(&dir);
            put(&dir, "n1/disk1", "a/x", b"1");
            put(&dir, "n2/disk1", "a/x", b"1");
            put(&dir, "n2/disk1", "b/y.partial", b"1");
            let files: Vec<String> = c.scan_files().await.unwrap().into_iter().collect();
            assert_eq!(files, vec!["/a/x"]);
        }
    }

    mod transfers {
        use super::*;

        #[tokio::test]
        async fn test_copy_with_checksums() {
            let dir = tempfile::tempdir().unwrap();
            let c = cluster(&dir);
            let data = vec![7u8; CHUNK_SIZE * 2 + 10];
            put(&dir, "n1/disk1", "iso/a.iso", &data);

            let progress = TransferProgress::new(data.len() as u64);
            let outcome = c
                .transfer(
                    &request("/iso/a.iso", "n1", "n2"),
                    &progress,
                    &CancellationToken::new(),
                )
                .await
                .unwrap();
            assert_eq!(outcome.bytes, data.len() as u64);
            assert_eq!(progress.transferred(), data.len() as u64);
            assert!(outcome.source_checksum.is_some());
            assert!(!outcome.checksum_mismatch());

            let copy = dir.path().join("n2/disk1/iso/a.iso");
            assert_eq!(std::fs::read(&copy).unwrap(), data);
            assert!(!partial_path(&copy).exists());
            c.add_holder("/iso/a.iso", "n2").await.unwrap();
            assert_eq!(c.holding_nodes("/iso/a.iso").await.unwrap().len(), 2);
        }

        #[tokio::test]
        async fn test_counters_settle_after_leg() {
            let dir = tempfile::tempdir().unwrap();
            let c = cluster(&dir);
            put(&dir, "n1/disk1", "f", b"abc");
            c.transfer(
                &request("/f", "n1", "n2"),
                &TransferProgress::new(3),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
            let n1 = c.node("n1").await.unwrap();
            let n2 = c.node("n2").await.unwrap();
            assert_eq!(n1.status.transfers_out, 0);
            assert_eq!(n2.status.transfers_in, 0);
            assert_eq!(n2.status.throughput_in_bps, 0);
            assert!(n1.status.last_activity_ms > 0);
        }

        #[tokio::test]
        async fn test_missing_source_is_file_gone() {
            let dir = tempfile::tempdir().unwrap();
            let c = cluster(&dir);
            let err = c
                .transfer(
                    &request("/nothing", "n1", "n2"),
                    &TransferProgress::new(0),
                    &CancellationToken::new(),
                )
                .await
                .unwrap_err();
            assert!(err.is_file_gone());
        }

        #[tokio::test]
        async fn test_offline_destination() {
            let dir = tempfile::tempdir().unwrap();
            let c = cluster(&dir);
            put(&dir, "n1/disk1", "f", b"abc");
            let err = c
                .transfer(
                    &request("/f", "n1", "n3"),
                    &TransferProgress::new(3),
                    &CancellationToken::new(),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, JobError::NodeUnreachable { node } if node == "n3"));
        }

        #[tokio::test]
        async fn test_cancelled_leg_leaves_nothing() {
            let dir = tempfile::tempdir().unwrap();
            let c = cluster(&dir);
            put(&dir, "n1/disk1", "big", &vec![1u8; CHUNK_SIZE * 4]);
            let cancel = CancellationToken::new();
            cancel.cancel();
            let err = c
                .transfer(&request("/big", "n1", "n2"), &TransferProgress::new(0), &cancel)
                .await
                .unwrap_err();
            assert!(matches!(err, JobError::Cancelled));
            let copy = dir.path().join("n2/disk1/big");
            assert!(!copy.exists());
            assert!(!partial_path(&copy).exists());
        }

        #[tokio::test]
        async fn test_existing_copy_not_overwritten() {
            let dir = tempfile::tempdir().unwrap();
            let c = cluster(&dir);
            put(&dir, "n1/disk1", "f", b"abc");
            put(&dir, "n2/disk1", "f", b"abc");
            let progress = TransferProgress::new(3);
            let same = c
                .transfer(&request("/f", "n1", "n2"), &progress, &CancellationToken::new())
                .await
                .unwrap();
            assert!(same.existing);
            assert_eq!(same.bytes, 0);
            assert_eq!(progress.transferred(), 0);
            assert!(!same.checksum_mismatch());

            put(&dir, "n2/disk1", "f", b"xyz");
            let differs = c
                .transfer(
                    &request("/f", "n1", "n2"),
                    &TransferProgress::new(3),
                    &CancellationToken::new(),
                )
                .await
                .unwrap();
            assert!(differs.existing);
            assert!(differs.checksum_mismatch());
            // The stale bytes are still there for the caller to judge.
            assert_eq!(std::fs::read(dir.path().join("n2/disk1/f")).unwrap(), b"xyz");
        }

        #[tokio::test]
        async fn test_delete_removes_copy() {
            let dir = tempfile::tempdir().unwrap();
            let c = cluster(&dir);
            put(&dir, "n1/disk1", "f", b"abc");
            put(&dir, "n2/disk1", "f", b"abc");
            c.delete("n2", "/f").await.unwrap();
            assert!(!dir.path().join("n2/disk1/f").exists());
            // Deleting an absent copy is not an error.
            c.delete("n2", "/f").await.unwrap();
            assert_eq!(c.holding_nodes("/f").await.unwrap().len(), 1);
        }
    }
}
