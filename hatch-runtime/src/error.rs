use hatch_bootstrap::{LaunchError, MachineError};
use hatch_environment::ProvisionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Workspace '{0}' already has an active runtime")]
    AlreadyExists(String),

    #[error("Workspace '{workspace}' is {actual}, cannot {operation}")]
    InvalidStatus {
        workspace: String,
        actual: String,
        operation: &'static str,
    },

    #[error("Provisioning failed for workspace '{workspace}': {source}")]
    Provision {
        workspace: String,
        #[source]
        source: ProvisionError,
    },

    #[error("Creating machine '{machine}' of workspace '{workspace}' failed: {source}")]
    Create {
        workspace: String,
        machine: String,
        #[source]
        source: MachineError,
    },

    #[error("Bootstrapping machine '{machine}' of workspace '{workspace}' failed: {source}")]
    Bootstrap {
        workspace: String,
        machine: String,
        #[source]
        source: LaunchError,
    },

    #[error("Start of workspace '{0}' was interrupted")]
    Interrupted(String),
}
