//! In-memory environment model.
//!
//! The model is mutated only by configuration provisioners; once a machine
//! has been handed to the container engine its config is treated as frozen.

use crate::error::ProvisionError;
use crate::installers::kahn_order;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A server a machine (or one of its installers) exposes once running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ServerConfig {
    pub fn new(port: u16, protocol: impl Into<String>) -> Self {
        Self {
            port,
            protocol: protocol.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// A named volume mounted into a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    pub mount_path: String,
}

/// A declarative unit the bootstrap agent executes inside a machine.
///
/// The `environment` property, when present, carries comma-separated
/// `KEY=VALUE` pairs that the installer-env provisioner lifts into the
/// owning machine's environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installer {
    pub id: String,
    pub script: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub servers: IndexMap<String, ServerConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl Installer {
    pub fn new(id: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            script: script.into(),
            properties: IndexMap::new(),
            servers: IndexMap::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(id.into());
        self
    }

    pub fn with_server(mut self, name: impl Into<String>, server: ServerConfig) -> Self {
        self.servers.insert(name.into(), server);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Everything needed to create one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub installers: Vec<Installer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub servers: IndexMap<String, ServerConfig>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exposed_ports: Vec<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_limit_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl MachineConfig {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            installers: Vec::new(),
            volumes: Vec::new(),
            env: IndexMap::new(),
            servers: IndexMap::new(),
            labels: IndexMap::new(),
            exposed_ports: Vec::new(),
            mem_limit_bytes: None,
            depends_on: Vec::new(),
        }
    }

    pub fn with_installer(mut self, installer: Installer) -> Self {
        self.installers.push(installer);
        self
    }

    pub fn with_dependency(mut self, machine: impl Into<String>) -> Self {
        self.depends_on.push(machine.into());
        self
    }
}

/// The whole environment: machines plus the private network they share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub machines: IndexMap<String, MachineConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            machines: IndexMap::new(),
            network: None,
        }
    }

    pub fn with_machine(mut self, name: impl Into<String>, machine: MachineConfig) -> Self {
        self.machines.insert(name.into(), machine);
        self
    }

    /// Machine start order honoring `depends_on`, declaration order for ties.
    pub fn start_order(&self) -> Result<Vec<String>, ProvisionError> {
        let nodes: Vec<(&str, &[String])> = self
            .machines
            .iter()
            .map(|(name, machine)| (name.as_str(), machine.depends_on.as_slice()))
            .collect();

        kahn_order(&nodes).map_err(|e| match e {
            crate::installers::OrderError::Unknown { node, dependency } => {
                ProvisionError::UnknownMachineDependency {
                    machine: node,
                    dependency,
                }
            }
            crate::installers::OrderError::Cycle(members) => {
                ProvisionError::DependencyCycle(members)
            }
        })
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
