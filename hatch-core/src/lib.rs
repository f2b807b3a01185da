//! Foundation types for the workspace runtime coordinator
//!
//! This crate holds the pieces every other layer depends on: the runtime
//! identity triple, the replicated workspace status enum, the structured
//! event model with its broadcast bus, coordinator configuration, and the
//! shared error type.

pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod status;

pub use bus::EventBus;
pub use config::CoordinatorConfig;
pub use error::{CoreError, Result};
pub use identity::RuntimeIdentity;
pub use status::{StatusChange, WorkspaceStatus};
