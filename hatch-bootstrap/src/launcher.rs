//! Agent launcher.
//!
//! Drives one machine through the bootstrap phases:
//!
//! `NotStarted → Injecting → Executing → WaitingReady → Ready | Failed | TimedOut`
//!
//! Injection and exec are synchronous calls against the container engine.
//! Readiness is asynchronous: the agent pushes installer status back and
//! the launcher consumes it off the event bus, bounded by the per-installer
//! timeout and the whole-machine bootstrapping deadline. One launcher
//! instance supervises one machine at a time.

use crate::archive::{build_archive, BootstrapConfig, BOOTSTRAPPER_DIR};
use crate::cmdline::bootstrap_command;
use crate::error::{LaunchError, Result};
use crate::machine::Machine;
use hatch_core::events::{BootstrapperStatus, InstallerStatus, RuntimeEvent};
use hatch_core::{CoordinatorConfig, EventBus, RuntimeIdentity};
use hatch_environment::{resolve_installers, Installer};
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPhase {
    NotStarted,
    Injecting,
    Executing,
    WaitingReady,
    Ready,
    Failed,
    TimedOut,
}

/// Where the agent pushes status events and log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEndpoints {
    pub status: String,
    pub logs: String,
}

impl PushEndpoints {
    pub fn new(status: impl Into<String>, logs: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            logs: logs.into(),
        }
    }
}

pub struct AgentLauncher {
    identity: RuntimeIdentity,
    bus: EventBus,
    config: CoordinatorConfig,
    endpoints: PushEndpoints,
    binary_path: PathBuf,
    enable_auth: bool,
    phase: Mutex<LaunchPhase>,
}

impl AgentLauncher {
    pub fn new(
        identity: RuntimeIdentity,
        bus: EventBus,
        config: CoordinatorConfig,
        endpoints: PushEndpoints,
        binary_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            identity,
            bus,
            config,
            endpoints,
            binary_path: binary_path.into(),
            enable_auth: false,
            phase: Mutex::new(LaunchPhase::NotStarted),
        }
    }

    pub fn with_auth(mut self) -> Self {
        self.enable_auth = true;
        self
    }

    pub fn phase(&self) -> LaunchPhase {
        *self.phase.lock().expect("phase lock")
    }

    fn set_phase(&self, phase: LaunchPhase) {
        *self.phase.lock().expect("phase lock") = phase;
    }

    /// Injects the bootstrap archive, executes the agent and waits until
    /// every installer reports ready.
    ///
    /// The whole call is bounded by the bootstrapping deadline; each
    /// installer additionally by the per-installer timeout. The declared
    /// installer list is resolved into dependency order first.
    pub async fn launch(&self, machine: &dyn Machine, installers: &[Installer]) -> Result<()> {
        if installers.is_empty() {
            debug!(machine = machine.name(), "no installers declared, nothing to bootstrap");
            self.set_phase(LaunchPhase::Ready);
            return Ok(());
        }

        let deadline = Instant::now() + self.config.bootstrapping_timeout();
        let resolved = match resolve_installers(installers) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.set_phase(LaunchPhase::Failed);
                return Err(e.into());
            }
        };

        // Subscribe before the agent can produce anything, so readiness
        // events cannot be missed.
        let mut events = self.bus.subscribe();

        self.set_phase(LaunchPhase::Injecting);
        let archive = match build_archive(&BootstrapConfig::new(resolved.clone()), &self.binary_path)
        {
            Ok(bytes) => bytes,
            Err(e) => {
                self.set_phase(LaunchPhase::Failed);
                return Err(e);
            }
        };
        if let Err(source) = machine.put_archive(BOOTSTRAPPER_DIR, archive).await {
            self.set_phase(LaunchPhase::Failed);
            return Err(LaunchError::Injection {
                machine: machine.name().to_string(),
                source,
            });
        }

        self.set_phase(LaunchPhase::Executing);
        let command = bootstrap_command(
            machine.name(),
            &self.identity,
            &self.endpoints,
            &self.config,
            self.enable_auth,
        );
        if let Err(source) = machine.exec(command).await {
            self.set_phase(LaunchPhase::Failed);
            return Err(LaunchError::Exec {
                machine: machine.name().to_string(),
                source,
            });
        }

        self.set_phase(LaunchPhase::WaitingReady);
        match self
            .await_ready(&mut events, machine.name(), &resolved, deadline)
            .await
        {
            Ok(()) => {
                info!(machine = machine.name(), workspace = %self.identity.workspace_id, "machine bootstrapped");
                self.set_phase(LaunchPhase::Ready);
                Ok(())
            }
            Err(e @ LaunchError::BootstrapTimeout { .. }) => {
                self.set_phase(LaunchPhase::TimedOut);
                Err(e)
            }
            Err(e) => {
                self.set_phase(LaunchPhase::Failed);
                Err(e)
            }
        }
    }

    async fn await_ready(
        &self,
        events: &mut broadcast::Receiver<RuntimeEvent>,
        machine_name: &str,
        installers: &[Installer],
        deadline: Instant,
    ) -> Result<()> {
        for installer in installers {
            let installer_deadline = Instant::now() + self.config.installer_timeout();

            'wait: loop {
                let now = Instant::now();
                if now >= deadline {
                    return Err(LaunchError::BootstrapTimeout {
                        machine: machine_name.to_string(),
                        timeout_mins: self.config.bootstrapping_timeout_mins,
                    });
                }
                if now >= installer_deadline {
                    return Err(LaunchError::InstallerTimeout {
                        machine: machine_name.to_string(),
                        installer: installer.id.clone(),
                        timeout_secs: self.config.installer_timeout_secs,
                    });
                }

                let event = match timeout_at(installer_deadline.min(deadline), events.recv()).await
                {
                    Err(_elapsed) => continue 'wait,
                    Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                        warn!(skipped, machine = machine_name, "event bus lagged during bootstrap wait");
                        continue 'wait;
                    }
                    Ok(Err(broadcast::error::RecvError::Closed)) => {
                        return Err(LaunchError::BusClosed {
                            machine: machine_name.to_string(),
                        });
                    }
                    Ok(Ok(event)) => event,
                };

                match event {
                    RuntimeEvent::InstallerStatus(e)
                        if e.identity == self.identity
                            && e.machine_name == machine_name
                            && e.installer_id == installer.id =>
                    {
                        match e.status {
                            // Running means the installer's servers answer;
                            // Done means a serverless script completed.
                            InstallerStatus::Done | InstallerStatus::Running => {
                                debug!(installer = %e.installer_id, machine = machine_name, "installer ready");
                                break 'wait;
                            }
                            InstallerStatus::Failed => {
                                return Err(LaunchError::InstallerFailed {
                                    machine: machine_name.to_string(),
                                    installer: installer.id.clone(),
                                    reason: e
                                        .error
                                        .unwrap_or_else(|| "no error reported".to_string()),
                                });
                            }
                            InstallerStatus::Starting => {}
                        }
                    }
                    RuntimeEvent::BootstrapperStatus(e)
                        if e.identity == self.identity && e.machine_name == machine_name =>
                    {
                        match e.status {
                            // The agent only reports Done once every
                            // installer finished; trust it and stop waiting.
                            BootstrapperStatus::Done => return Ok(()),
                            BootstrapperStatus::Failed => {
                                return Err(LaunchError::AgentFailed {
                                    machine: machine_name.to_string(),
                                    reason: e
                                        .error
                                        .unwrap_or_else(|| "no error reported".to_string()),
                                });
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}

/// Appends `command` to the script of installer `installer_id`.
///
/// Launcher variants (for example starting an exec/terminal agent alongside
/// the workspace agent) are composed this way instead of specializing the
/// launch algorithm itself.
pub fn augment_script(
    installers: Vec<Installer>,
    installer_id: &str,
    command: &str,
) -> Vec<Installer> {
    installers
        .into_iter()
        .map(|mut installer| {
            if installer.id == installer_id {
                installer.script = format!("{}\n{}", installer.script, command);
            }
            installer
        })
        .collect()
}
