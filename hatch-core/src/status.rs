use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Replicated workspace status.
///
/// This is the single piece of state shared across all cluster members:
/// exactly one value per workspace id at any instant, identical on every
/// node after a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkspaceStatus {
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl Display for WorkspaceStatus {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let s = match self {
            WorkspaceStatus::Starting => "STARTING",
            WorkspaceStatus::Running => "RUNNING",
            WorkspaceStatus::Stopping => "STOPPING",
            WorkspaceStatus::Stopped => "STOPPED",
        };
        write!(f, "{}", s)
    }
}

/// A status transition as delivered to cluster-wide subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub workspace_id: String,
    pub status: WorkspaceStatus,
}

impl StatusChange {
    pub fn new(workspace_id: impl Into<String>, status: WorkspaceStatus) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            status,
        }
    }
}
