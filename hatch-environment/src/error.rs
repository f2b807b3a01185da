use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProvisionError>;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Provisioner '{provisioner}' failed: {reason}")]
    Rejected { provisioner: String, reason: String },

    #[error("Installer '{installer}' depends on unknown installer '{dependency}'")]
    UnknownDependency { installer: String, dependency: String },

    #[error("Machine '{machine}' depends on unknown machine '{dependency}'")]
    UnknownMachineDependency { machine: String, dependency: String },

    #[error("Dependency cycle among: {0}")]
    DependencyCycle(String),

    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),
}

impl ProvisionError {
    pub fn rejected(provisioner: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            provisioner: provisioner.into(),
            reason: reason.into(),
        }
    }
}
