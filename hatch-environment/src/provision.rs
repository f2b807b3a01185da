//! Configuration provisioner pipeline.
//!
//! Provisioners are pure transformations applied to the environment model
//! before any machine exists. Two classes are registered separately:
//!
//! - *environment-relative* provisioners may read the runtime identity and
//!   the per-environment installer configuration;
//! - *container-system-settings* provisioners apply infrastructure defaults
//!   and must not depend on per-environment installer configuration.
//!
//! Provisioners of the same class are unordered and must not depend on each
//! other; a legitimate ordering requirement belongs inside one provisioner.
//! The pipeline works on a copy of the model, so a failing provisioner
//! discards every partially applied mutation.

use crate::error::ProvisionError;
use crate::model::Environment;
use hatch_core::RuntimeIdentity;
use tracing::debug;

/// Installer property carrying comma-separated `KEY=VALUE` pairs to inject
/// into the owning machine's environment.
pub const ENVIRONMENT_PROPERTY: &str = "environment";

pub trait ConfigurationProvisioner: Send + Sync {
    fn name(&self) -> &str;

    fn provision(
        &self,
        environment: &mut Environment,
        identity: &RuntimeIdentity,
    ) -> Result<(), ProvisionError>;
}

/// Ordered application of the two provisioner classes.
#[derive(Default)]
pub struct ProvisionerPipeline {
    environment_relative: Vec<Box<dyn ConfigurationProvisioner>>,
    container_system: Vec<Box<dyn ConfigurationProvisioner>>,
}

impl ProvisionerPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_environment_relative(
        mut self,
        provisioner: Box<dyn ConfigurationProvisioner>,
    ) -> Self {
        self.environment_relative.push(provisioner);
        self
    }

    pub fn with_container_system(
        mut self,
        provisioner: Box<dyn ConfigurationProvisioner>,
    ) -> Self {
        self.container_system.push(provisioner);
        self
    }

    /// Runs every provisioner over a copy of `environment`.
    ///
    /// Returns the fully transformed model, or the first failure with the
    /// input model left untouched.
    pub fn provision(
        &self,
        environment: &Environment,
        identity: &RuntimeIdentity,
    ) -> Result<Environment, ProvisionError> {
        let mut transformed = environment.clone();

        for provisioner in self
            .environment_relative
            .iter()
            .chain(self.container_system.iter())
        {
            debug!(provisioner = provisioner.name(), workspace = %identity.workspace_id, "applying provisioner");
            provisioner.provision(&mut transformed, identity)?;
        }

        Ok(transformed)
    }
}

/// Lifts installer-declared `environment` properties into machine env vars.
///
/// Machine-declared variables win over installer-declared ones.
pub struct InstallerEnvProvisioner;

impl ConfigurationProvisioner for InstallerEnvProvisioner {
    fn name(&self) -> &str {
        "installer-env"
    }

    fn provision(
        &self,
        environment: &mut Environment,
        _identity: &RuntimeIdentity,
    ) -> Result<(), ProvisionError> {
        for machine in environment.machines.values_mut() {
            let mut injected = Vec::new();
            for installer in &machine.installers {
                if let Some(declared) = installer.properties.get(ENVIRONMENT_PROPERTY) {
                    for pair in declared.split(',').filter(|p| !p.trim().is_empty()) {
                        let Some((key, value)) = pair.split_once('=') else {
                            return Err(ProvisionError::rejected(
                                self.name(),
                                format!(
                                    "installer '{}' declares malformed environment entry '{}'",
                                    installer.id, pair
                                ),
                            ));
                        };
                        injected.push((key.trim().to_string(), value.trim().to_string()));
                    }
                }
            }
            for (key, value) in injected {
                machine.env.entry(key).or_insert(value);
            }
        }
        Ok(())
    }
}

/// Exposes installer-declared servers on the owning machine.
///
/// Server names must be unique per machine unless redeclared identically;
/// declared ports are added to the machine's exposure list.
pub struct InstallerServersProvisioner;

impl ConfigurationProvisioner for InstallerServersProvisioner {
    fn name(&self) -> &str {
        "installer-servers"
    }

    fn provision(
        &self,
        environment: &mut Environment,
        _identity: &RuntimeIdentity,
    ) -> Result<(), ProvisionError> {
        for (machine_name, machine) in environment.machines.iter_mut() {
            let declared: Vec<_> = machine
                .installers
                .iter()
                .flat_map(|i| {
                    i.servers
                        .iter()
                        .map(|(name, server)| (i.id.clone(), name.clone(), server.clone()))
                })
                .collect();

            for (installer_id, name, server) in declared {
                match machine.servers.get(&name) {
                    Some(existing) if *existing != server => {
                        return Err(ProvisionError::rejected(
                            self.name(),
                            format!(
                                "server '{}' of installer '{}' conflicts with an existing server on machine '{}'",
                                name, installer_id, machine_name
                            ),
                        ));
                    }
                    Some(_) => {}
                    None => {
                        machine.servers.insert(name, server.clone());
                    }
                }
                if !machine.exposed_ports.contains(&server.port) {
                    machine.exposed_ports.push(server.port);
                }
            }
        }
        Ok(())
    }
}

/// Stamps runtime identity labels on every machine.
///
/// Container-system-settings class: reads the identity only, never the
/// per-environment installer configuration.
pub struct RuntimeLabelsProvisioner;

pub const LABEL_WORKSPACE_ID: &str = "io.hatch.workspace.id";
pub const LABEL_ENVIRONMENT: &str = "io.hatch.environment.name";
pub const LABEL_OWNER: &str = "io.hatch.owner.id";
pub const LABEL_MACHINE_NAME: &str = "io.hatch.machine.name";

impl ConfigurationProvisioner for RuntimeLabelsProvisioner {
    fn name(&self) -> &str {
        "runtime-labels"
    }

    fn provision(
        &self,
        environment: &mut Environment,
        identity: &RuntimeIdentity,
    ) -> Result<(), ProvisionError> {
        for (machine_name, machine) in environment.machines.iter_mut() {
            machine
                .labels
                .insert(LABEL_WORKSPACE_ID.to_string(), identity.workspace_id.clone());
            machine.labels.insert(
                LABEL_ENVIRONMENT.to_string(),
                identity.environment_name.clone(),
            );
            machine
                .labels
                .insert(LABEL_OWNER.to_string(), identity.owner_id.clone());
            machine
                .labels
                .insert(LABEL_MACHINE_NAME.to_string(), machine_name.clone());
        }
        Ok(())
    }
}

/// Applies a default memory limit to machines that declare none.
pub struct MemoryLimitProvisioner {
    default_bytes: u64,
}

impl MemoryLimitProvisioner {
    pub fn new(default_bytes: u64) -> Self {
        Self { default_bytes }
    }
}

impl ConfigurationProvisioner for MemoryLimitProvisioner {
    fn name(&self) -> &str {
        "memory-limit"
    }

    fn provision(
        &self,
        environment: &mut Environment,
        _identity: &RuntimeIdentity,
    ) -> Result<(), ProvisionError> {
        for machine in environment.machines.values_mut() {
            machine.mem_limit_bytes.get_or_insert(self.default_bytes);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Installer, MachineConfig, ServerConfig};

    fn identity() -> RuntimeIdentity {
        RuntimeIdentity::new("ws1", "default", "alice")
    }

    fn sample_environment() -> Environment {
        let installer = Installer::new("org.hatch.ws-agent", "ws-agent.sh")
            .with_property(ENVIRONMENT_PROPERTY, "AGENT_PORT=4401, AGENT_MODE=dev")
            .with_server("ws-agent", ServerConfig::new(4401, "http").with_path("/api"));

        Environment::new().with_machine(
            "dev-machine",
            MachineConfig::new("eclipse/ubuntu_jdk8").with_installer(installer),
        )
    }

    fn full_pipeline() -> ProvisionerPipeline {
        ProvisionerPipeline::new()
            .with_environment_relative(Box::new(InstallerEnvProvisioner))
            .with_environment_relative(Box::new(InstallerServersProvisioner))
            .with_container_system(Box::new(RuntimeLabelsProvisioner))
            .with_container_system(Box::new(MemoryLimitProvisioner::new(2 * 1024 * 1024 * 1024)))
    }

    #[test]
    fn installer_env_vars_are_injected() {
        let provisioned = full_pipeline()
            .provision(&sample_environment(), &identity())
            .unwrap();

        let machine = &provisioned.machines["dev-machine"];
        assert_eq!(machine.env["AGENT_PORT"], "4401");
        assert_eq!(machine.env["AGENT_MODE"], "dev");
    }

    #[test]
    fn machine_declared_env_wins_over_installer() {
        let mut env = sample_environment();
        env.machines["dev-machine"]
            .env
            .insert("AGENT_PORT".to_string(), "9999".to_string());

        let provisioned = full_pipeline().provision(&env, &identity()).unwrap();
        assert_eq!(provisioned.machines["dev-machine"].env["AGENT_PORT"], "9999");
    }

    #[test]
    fn installer_servers_are_exposed() {
        let provisioned = full_pipeline()
            .provision(&sample_environment(), &identity())
            .unwrap();

        let machine = &provisioned.machines["dev-machine"];
        assert_eq!(machine.servers["ws-agent"].port, 4401);
        assert!(machine.exposed_ports.contains(&4401));
    }

    #[test]
    fn identity_labels_are_stamped() {
        let provisioned = full_pipeline()
            .provision(&sample_environment(), &identity())
            .unwrap();

        let labels = &provisioned.machines["dev-machine"].labels;
        assert_eq!(labels[LABEL_WORKSPACE_ID], "ws1");
        assert_eq!(labels[LABEL_OWNER], "alice");
        assert_eq!(labels[LABEL_MACHINE_NAME], "dev-machine");
    }

    #[test]
    fn default_memory_limit_applies_only_when_absent() {
        let mut env = sample_environment();
        env.machines["dev-machine"].mem_limit_bytes = Some(512);

        let provisioned = full_pipeline().provision(&env, &identity()).unwrap();
        assert_eq!(provisioned.machines["dev-machine"].mem_limit_bytes, Some(512));
    }

    #[test]
    fn provisioning_twice_yields_identical_output() {
        let pipeline = full_pipeline();
        let env = sample_environment();

        let first = pipeline.provision(&env, &identity()).unwrap();
        let second = pipeline.provision(&env, &identity()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn failure_leaves_input_untouched() {
        struct FailingProvisioner;
        impl ConfigurationProvisioner for FailingProvisioner {
            fn name(&self) -> &str {
                "failing"
            }
            fn provision(
                &self,
                environment: &mut Environment,
                _identity: &RuntimeIdentity,
            ) -> Result<(), ProvisionError> {
                // Mutate first, then fail: the mutation must not leak out.
                environment.machines.clear();
                Err(ProvisionError::rejected("failing", "boom"))
            }
        }

        let pipeline = ProvisionerPipeline::new()
            .with_environment_relative(Box::new(InstallerEnvProvisioner))
            .with_container_system(Box::new(FailingProvisioner));

        let env = sample_environment();
        let before = env.clone();

        assert!(pipeline.provision(&env, &identity()).is_err());
        assert_eq!(env, before);
    }

    #[test]
    fn malformed_environment_property_is_rejected() {
        let installer = Installer::new("bad", "bad.sh")
            .with_property(ENVIRONMENT_PROPERTY, "NOT_A_PAIR");
        let env = Environment::new()
            .with_machine("m1", MachineConfig::new("img").with_installer(installer));

        assert!(matches!(
            full_pipeline().provision(&env, &identity()),
            Err(ProvisionError::Rejected { .. })
        ));
    }
}
