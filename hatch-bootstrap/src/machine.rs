//! The container-engine seam.
//!
//! Concrete drivers (Docker, Kubernetes, OpenShift clients) implement
//! [`Machine`] for a running container/pod; the coordinator only ever
//! talks to this trait.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MachineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine error: {0}")]
    Engine(String),
}

impl MachineError {
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine(message.into())
    }
}

/// One running machine of a workspace environment.
#[async_trait]
pub trait Machine: Send + Sync {
    /// Machine name as declared in the environment model.
    fn name(&self) -> &str;

    /// Unpacks a tar.gz archive into `remote_dir` inside the machine.
    async fn put_archive(&self, remote_dir: &str, archive: Vec<u8>) -> Result<(), MachineError>;

    /// Starts a process inside the machine without waiting for it to exit.
    async fn exec(&self, command: Vec<String>) -> Result<(), MachineError>;

    /// Destroys the machine. Must be safe to call on a half-started one.
    async fn destroy(&self) -> Result<(), MachineError>;
}
