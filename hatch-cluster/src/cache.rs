//! The status cache one node holds.

use crate::error::Result;
use crate::group::StatusGroup;
use hatch_core::{StatusChange, WorkspaceStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Cluster-consistent workspace status map.
///
/// CAS (`replace_if`) is the only sanctioned way to move a workspace out of
/// a known state; `put_if_absent` claims a transition when nothing else is
/// racing on it. Subscribers receive every change made anywhere in the
/// cluster, including by this process; a removed entry is reported as
/// [`WorkspaceStatus::Stopped`].
pub trait ReplicatedStatusMap: Send + Sync {
    fn get(&self, workspace_id: &str) -> Option<WorkspaceStatus>;

    /// Inserts and returns `None` when absent, otherwise returns the
    /// existing status untouched.
    fn put_if_absent(&self, workspace_id: &str, status: WorkspaceStatus)
        -> Option<WorkspaceStatus>;

    /// Replaces the status of a present entry, returning the previous one.
    /// Absent entries are not created.
    fn replace(&self, workspace_id: &str, status: WorkspaceStatus) -> Option<WorkspaceStatus>;

    /// Compare-and-swap: replaces only if the current status equals
    /// `expected`. A `false` return means nothing was altered.
    fn replace_if(
        &self,
        workspace_id: &str,
        expected: WorkspaceStatus,
        status: WorkspaceStatus,
    ) -> bool;

    fn remove(&self, workspace_id: &str) -> Option<WorkspaceStatus>;

    fn subscribe(&self) -> broadcast::Receiver<StatusChange>;

    /// Leaves the replication group. Best-effort: logged, never fails.
    fn shutdown(&self);
}

/// One cluster member's handle on the replicated status map.
pub struct ClusterStatusCache {
    group: Arc<StatusGroup>,
    left: AtomicBool,
}

impl ClusterStatusCache {
    /// Joins `group`. Failing to join is fatal for the node: without a
    /// cluster-wide view it must not serve workspace status queries.
    pub fn join(group: Arc<StatusGroup>) -> Result<Self> {
        group.join()?;
        info!(group = group.name(), "joined workspace status replication group");
        Ok(Self {
            group,
            left: AtomicBool::new(false),
        })
    }
}

impl ReplicatedStatusMap for ClusterStatusCache {
    fn get(&self, workspace_id: &str) -> Option<WorkspaceStatus> {
        self.group.get(workspace_id)
    }

    fn put_if_absent(
        &self,
        workspace_id: &str,
        status: WorkspaceStatus,
    ) -> Option<WorkspaceStatus> {
        self.group.put_if_absent(workspace_id, status)
    }

    fn replace(&self, workspace_id: &str, status: WorkspaceStatus) -> Option<WorkspaceStatus> {
        self.group.replace(workspace_id, status)
    }

    fn replace_if(
        &self,
        workspace_id: &str,
        expected: WorkspaceStatus,
        status: WorkspaceStatus,
    ) -> bool {
        self.group.replace_if(workspace_id, expected, status)
    }

    fn remove(&self, workspace_id: &str) -> Option<WorkspaceStatus> {
        self.group.remove(workspace_id)
    }

    fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.group.subscribe()
    }

    fn shutdown(&self) {
        if !self.left.swap(true, Ordering::SeqCst) {
            self.group.leave();
            info!(group = self.group.name(), "left workspace status replication group");
        }
    }
}

impl Drop for ClusterStatusCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}
