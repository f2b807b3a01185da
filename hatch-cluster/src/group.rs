//! The replication group seam.
//!
//! A [`StatusGroup`] is what a networked group-communication toolkit would
//! provide: a named group with member bookkeeping, a consistent entry map,
//! and fan-out of every change to all members' subscribers. All single-key
//! operations are linearizable (one lock, no multi-key transactions).
//! Change notifications are sent while the lock is held so subscribers
//! observe them in operation order.

use crate::error::ClusterError;
use hatch_core::{StatusChange, WorkspaceStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

const CHANGE_CAPACITY: usize = 256;

struct GroupState {
    entries: HashMap<String, WorkspaceStatus>,
    members: usize,
    closed: bool,
}

pub struct StatusGroup {
    name: String,
    state: Mutex<GroupState>,
    changes: broadcast::Sender<StatusChange>,
}

impl StatusGroup {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Arc::new(Self {
            name: name.into(),
            state: Mutex::new(GroupState {
                entries: HashMap::new(),
                members: 0,
                closed: false,
            }),
            changes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Closes the group: no further members can join.
    pub fn close(&self) {
        self.state.lock().expect("group lock").closed = true;
    }

    pub fn member_count(&self) -> usize {
        self.state.lock().expect("group lock").members
    }

    pub(crate) fn join(&self) -> Result<(), ClusterError> {
        let mut state = self.state.lock().expect("group lock");
        if state.closed {
            return Err(ClusterError::Unavailable(self.name.clone()));
        }
        state.members += 1;
        Ok(())
    }

    pub(crate) fn leave(&self) {
        let mut state = self.state.lock().expect("group lock");
        state.members = state.members.saturating_sub(1);
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.changes.subscribe()
    }

    pub(crate) fn get(&self, workspace_id: &str) -> Option<WorkspaceStatus> {
        self.state
            .lock()
            .expect("group lock")
            .entries
            .get(workspace_id)
            .copied()
    }

    pub(crate) fn put_if_absent(
        &self,
        workspace_id: &str,
        status: WorkspaceStatus,
    ) -> Option<WorkspaceStatus> {
        let mut state = self.state.lock().expect("group lock");
        match state.entries.get(workspace_id).copied() {
            Some(existing) => Some(existing),
            None => {
                state.entries.insert(workspace_id.to_string(), status);
                let _ = self.changes.send(StatusChange::new(workspace_id, status));
                None
            }
        }
    }

    pub(crate) fn replace(
        &self,
        workspace_id: &str,
        status: WorkspaceStatus,
    ) -> Option<WorkspaceStatus> {
        let mut state = self.state.lock().expect("group lock");
        match state.entries.get_mut(workspace_id) {
            Some(entry) => {
                let previous = *entry;
                *entry = status;
                let _ = self.changes.send(StatusChange::new(workspace_id, status));
                Some(previous)
            }
            None => None,
        }
    }

    pub(crate) fn replace_if(
        &self,
        workspace_id: &str,
        expected: WorkspaceStatus,
        status: WorkspaceStatus,
    ) -> bool {
        let mut state = self.state.lock().expect("group lock");
        match state.entries.get_mut(workspace_id) {
            Some(entry) if *entry == expected => {
                *entry = status;
                let _ = self.changes.send(StatusChange::new(workspace_id, status));
                true
            }
            _ => false,
        }
    }

    pub(crate) fn remove(&self, workspace_id: &str) -> Option<WorkspaceStatus> {
        let mut state = self.state.lock().expect("group lock");
        let previous = state.entries.remove(workspace_id);
        if previous.is_some() {
            // Removal is the implicit terminal transition.
            let _ = self
                .changes
                .send(StatusChange::new(workspace_id, WorkspaceStatus::Stopped));
        }
        previous
    }
}
