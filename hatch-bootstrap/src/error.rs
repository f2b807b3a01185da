use crate::machine::MachineError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LaunchError>;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Failed to inject bootstrap archive into machine '{machine}': {source}")]
    Injection {
        machine: String,
        #[source]
        source: MachineError,
    },

    #[error("Failed to execute bootstrap agent in machine '{machine}': {source}")]
    Exec {
        machine: String,
        #[source]
        source: MachineError,
    },

    #[error("Installer '{installer}' did not become ready within {timeout_secs}s in machine '{machine}'")]
    InstallerTimeout {
        machine: String,
        installer: String,
        timeout_secs: u64,
    },

    #[error("Installer '{installer}' failed in machine '{machine}': {reason}")]
    InstallerFailed {
        machine: String,
        installer: String,
        reason: String,
    },

    #[error("Bootstrapping machine '{machine}' exceeded the {timeout_mins}min deadline")]
    BootstrapTimeout { machine: String, timeout_mins: u64 },

    #[error("Bootstrap agent reported failure in machine '{machine}': {reason}")]
    AgentFailed { machine: String, reason: String },

    #[error("Event bus closed while waiting on machine '{machine}'")]
    BusClosed { machine: String },

    #[error(transparent)]
    Environment(#[from] hatch_environment::ProvisionError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error while building bootstrap archive: {0}")]
    Io(#[from] std::io::Error),
}
