//! The machine-creation seam.
//!
//! A concrete engine (Docker, Kubernetes, OpenShift driver) turns one
//! provisioned [`MachineConfig`] into a running [`Machine`]. Drivers are
//! external collaborators; the coordinator never sees their wire protocol.

use async_trait::async_trait;
use hatch_bootstrap::{Machine, MachineError};
use hatch_core::RuntimeIdentity;
use hatch_environment::MachineConfig;
use std::sync::Arc;

#[async_trait]
pub trait MachineEngine: Send + Sync {
    /// Creates and starts the container/pod for `config`.
    ///
    /// The returned machine is running but not yet bootstrapped.
    async fn create(
        &self,
        machine_name: &str,
        config: &MachineConfig,
        identity: &RuntimeIdentity,
        network: Option<&str>,
    ) -> Result<Arc<dyn Machine>, MachineError>;
}
