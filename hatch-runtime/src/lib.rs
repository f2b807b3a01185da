//! Workspace runtime coordination
//!
//! Ties the layers together: a start request runs the provisioner pipeline,
//! creates machines through the engine seam, bootstraps each one, and moves
//! the workspace through the replicated status cache so every cluster node
//! observes the same lifecycle. A failed start always tears back down to
//! `Stopped`; a workspace is never left stuck in `Starting`.

pub mod engine;
pub mod error;
pub mod runtime;

pub use engine::MachineEngine;
pub use error::{Result, RuntimeError};
pub use runtime::WorkspaceRuntime;
