//! Environment model and configuration provisioning
//!
//! An [`model::Environment`] is the in-memory description of everything a
//! workspace start needs: machines, their installers, volumes, env vars and
//! declared servers. Before any machine is created the model runs through a
//! [`provision::ProvisionerPipeline`] of pure transformations; only a fully
//! provisioned model is handed to the container engine.

pub mod error;
pub mod installers;
pub mod model;
pub mod provision;

pub use error::{ProvisionError, Result};
pub use installers::resolve_installers;
pub use model::{Environment, Installer, MachineConfig, ServerConfig, Volume};
pub use provision::{
    ConfigurationProvisioner, InstallerEnvProvisioner, InstallerServersProvisioner,
    MemoryLimitProvisioner, ProvisionerPipeline, RuntimeLabelsProvisioner,
};
