//! Start/stop orchestration for one workspace runtime.

use crate::engine::MachineEngine;
use crate::error::{Result, RuntimeError};
use hatch_bootstrap::{AgentLauncher, Machine, PushEndpoints};
use hatch_cluster::ReplicatedStatusMap;
use hatch_core::events::{MachineStatus, MachineStatusEvent, RuntimeEvent};
use hatch_core::{CoordinatorConfig, EventBus, RuntimeIdentity, WorkspaceStatus};
use hatch_environment::{Environment, ProvisionerPipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// One workspace's runtime: provisions, starts, bootstraps and stops the
/// machines of a single environment, keeping the replicated status cache
/// and the event bus in step.
pub struct WorkspaceRuntime {
    identity: RuntimeIdentity,
    environment: Environment,
    pipeline: ProvisionerPipeline,
    engine: Arc<dyn MachineEngine>,
    status_cache: Arc<dyn ReplicatedStatusMap>,
    bus: EventBus,
    config: CoordinatorConfig,
    endpoints: PushEndpoints,
    bootstrap_binary: PathBuf,
    enable_auth: bool,
    /// Started machines in start order; drained on teardown.
    machines: Mutex<Vec<(String, Arc<dyn Machine>)>>,
}

impl WorkspaceRuntime {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: RuntimeIdentity,
        environment: Environment,
        engine: Arc<dyn MachineEngine>,
        status_cache: Arc<dyn ReplicatedStatusMap>,
        bus: EventBus,
        config: CoordinatorConfig,
        endpoints: PushEndpoints,
        bootstrap_binary: impl Into<PathBuf>,
    ) -> Self {
        Self {
            identity,
            environment,
            pipeline: ProvisionerPipeline::new(),
            engine,
            status_cache,
            bus,
            config,
            endpoints,
            bootstrap_binary: bootstrap_binary.into(),
            enable_auth: false,
            machines: Mutex::new(Vec::new()),
        }
    }

    pub fn with_pipeline(mut self, pipeline: ProvisionerPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_auth(mut self) -> Self {
        self.enable_auth = true;
        self
    }

    pub fn identity(&self) -> &RuntimeIdentity {
        &self.identity
    }

    /// Starts the workspace runtime.
    ///
    /// Claims the `Starting` slot in the status cache, provisions the
    /// environment, then creates and bootstraps every machine in dependency
    /// order. On success the cache transitions `Starting → Running`; on any
    /// failure started machines are destroyed, the cache entry is removed
    /// (subscribers observe `Stopped`) and the causal error is returned.
    pub async fn start(&self) -> Result<()> {
        let workspace_id = self.identity.workspace_id.clone();

        if self
            .status_cache
            .put_if_absent(&workspace_id, WorkspaceStatus::Starting)
            .is_some()
        {
            return Err(RuntimeError::AlreadyExists(workspace_id));
        }

        match self.start_machines().await {
            Ok(()) => {
                if !self.status_cache.replace_if(
                    &workspace_id,
                    WorkspaceStatus::Starting,
                    WorkspaceStatus::Running,
                ) {
                    // The claim vanished under us; undo everything.
                    warn!(workspace = %workspace_id, "start interrupted, tearing down");
                    self.destroy_machines_quietly().await;
                    self.status_cache.remove(&workspace_id);
                    return Err(RuntimeError::Interrupted(workspace_id));
                }
                info!(workspace = %workspace_id, "workspace running");
                Ok(())
            }
            Err(e) => {
                self.destroy_machines_quietly().await;
                self.status_cache.remove(&workspace_id);
                Err(e)
            }
        }
    }

    /// Stops a running workspace: `Running → Stopping`, machines destroyed
    /// in reverse start order, then the cache entry removed so subscribers
    /// observe `Stopped`.
    pub async fn stop(&self) -> Result<()> {
        let workspace_id = self.identity.workspace_id.clone();

        if !self.status_cache.replace_if(
            &workspace_id,
            WorkspaceStatus::Running,
            WorkspaceStatus::Stopping,
        ) {
            let actual = match self.status_cache.get(&workspace_id) {
                Some(status) => status.to_string(),
                None => "not running".to_string(),
            };
            return Err(RuntimeError::InvalidStatus {
                workspace: workspace_id,
                actual,
                operation: "stop",
            });
        }

        self.destroy_machines_quietly().await;
        self.status_cache.remove(&workspace_id);
        info!(workspace = %workspace_id, "workspace stopped");
        Ok(())
    }

    /// Names of currently started machines, in start order.
    pub async fn machine_names(&self) -> Vec<String> {
        self.machines
            .lock()
            .await
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    async fn start_machines(&self) -> Result<()> {
        let workspace_id = &self.identity.workspace_id;

        let provisioned = self
            .pipeline
            .provision(&self.environment, &self.identity)
            .map_err(|source| RuntimeError::Provision {
                workspace: workspace_id.clone(),
                source,
            })?;
        let order = provisioned
            .start_order()
            .map_err(|source| RuntimeError::Provision {
                workspace: workspace_id.clone(),
                source,
            })?;

        for machine_name in order {
            let machine_config = &provisioned.machines[&machine_name];
            self.publish_machine_status(&machine_name, MachineStatus::Starting, None);

            let machine = match self
                .engine
                .create(
                    &machine_name,
                    machine_config,
                    &self.identity,
                    provisioned.network.as_deref(),
                )
                .await
            {
                Ok(machine) => machine,
                Err(source) => {
                    self.publish_machine_status(
                        &machine_name,
                        MachineStatus::Failed,
                        Some(source.to_string()),
                    );
                    return Err(RuntimeError::Create {
                        workspace: workspace_id.clone(),
                        machine: machine_name,
                        source,
                    });
                }
            };

            self.machines
                .lock()
                .await
                .push((machine_name.clone(), Arc::clone(&machine)));

            let launcher = AgentLauncher::new(
                self.identity.clone(),
                self.bus.clone(),
                self.config.clone(),
                self.endpoints.clone(),
                &self.bootstrap_binary,
            );
            let launcher = if self.enable_auth {
                launcher.with_auth()
            } else {
                launcher
            };

            if let Err(source) = launcher
                .launch(machine.as_ref(), &machine_config.installers)
                .await
            {
                self.publish_machine_status(
                    &machine_name,
                    MachineStatus::Failed,
                    Some(source.to_string()),
                );
                return Err(RuntimeError::Bootstrap {
                    workspace: workspace_id.clone(),
                    machine: machine_name,
                    source,
                });
            }

            self.publish_machine_status(&machine_name, MachineStatus::Running, None);
        }

        Ok(())
    }

    /// Destroys started machines in reverse start order, suppressing
    /// individual failures: teardown always finishes.
    async fn destroy_machines_quietly(&self) {
        let mut machines = self.machines.lock().await;
        while let Some((name, machine)) = machines.pop() {
            if let Err(e) = machine.destroy().await {
                error!(
                    workspace = %self.identity.workspace_id,
                    machine = %name,
                    error = %e,
                    "error destroying machine"
                );
            }
            self.publish_machine_status(&name, MachineStatus::Stopped, None);
        }
    }

    fn publish_machine_status(
        &self,
        machine_name: &str,
        status: MachineStatus,
        error: Option<String>,
    ) {
        self.bus
            .publish(RuntimeEvent::MachineStatus(MachineStatusEvent {
                identity: self.identity.clone(),
                machine_name: machine_name.to_string(),
                status,
                error,
            }));
    }
}
