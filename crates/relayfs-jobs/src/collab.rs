//! Collaborators the scheduler drives: the node roster, the file index and
//! the agent that moves bytes between nodes.

use crate::error::JobResult;
use crate::transfer::{TransferOutcome, TransferProgress, TransferRequest};
use async_trait::async_trait;
use relayfs_select::Node;
use tokio_util::sync::CancellationToken;

/// Live view of the storage nodes.
#[async_trait]
pub trait NodeRoster: Send + Sync + 'static {
    /// Nodes currently connected, with fresh status.
    async fn available_nodes(&self) -> JobResult<Vec<Node>>;
}

/// The narrow slice of the virtual filesystem the scheduler needs.
///
/// Every method fails with `FileGone` when `path` does not exist.
#[async_trait]
pub trait FileIndex: Send + Sync + 'static {
    /// Every node recorded as holding a copy, reachable or not.
    async fn holding_nodes(&self, path: &str) -> JobResult<Vec<Node>>;

    /// Holders that are currently reachable.
    async fn available_holding_nodes(&self, path: &str) -> JobResult<Vec<Node>> {
        Ok(self
            .holding_nodes(path)
            .await?
            .into_iter()
            .filter(Node::is_available)
            .collect())
    }

    /// File size in bytes.
    async fn size(&self, path: &str) -> JobResult<u64>;

    /// Record `node` as holding a copy.
    async fn add_holder(&self, path: &str, node: &str) -> JobResult<()>;

    /// Forget that `node` holds a copy.
    async fn remove_holder(&self, path: &str, node: &str) -> JobResult<()>;
}

/// Moves one file between two nodes.
#[async_trait]
pub trait TransferAgent: Send + Sync + 'static {
    /// Copy `request.path` from source to destination, updating `progress`
    /// as bytes arrive. Must return `Cancelled` promptly once `cancel` fires.
    ///
    /// A source without the file reports `FileGone`; a failure on either side
    /// reports `Transfer` or `NodeUnreachable` naming that side.
    async fn transfer(
        &self,
        request: &TransferRequest,
        progress: &TransferProgress,
        cancel: &CancellationToken,
    ) -> JobResult<TransferOutcome>;

    /// Delete the copy of `path` on `node`.
    async fn delete(&self, node: &str, path: &str) -> JobResult<()>;
}
