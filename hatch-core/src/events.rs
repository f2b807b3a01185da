//! Structured events published on the coordinator event bus.
//!
//! Consumers (websocket relays, test harnesses) subscribe through
//! [`crate::bus::EventBus`]; producers are the machine starter, the
//! bootstrapper and the log relay.

use crate::identity::RuntimeIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-machine lifecycle state as observed by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineStatus {
    Starting,
    Running,
    Failed,
    Stopped,
}

/// Per-installer state pushed back by the bootstrap agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallerStatus {
    Starting,
    Running,
    Done,
    Failed,
}

/// Terminal state of a whole bootstrap run on one machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BootstrapperStatus {
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineStatusEvent {
    pub identity: RuntimeIdentity,
    pub machine_name: String,
    pub status: MachineStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerStatusEvent {
    pub identity: RuntimeIdentity,
    pub machine_name: String,
    pub installer_id: String,
    pub status: InstallerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapperStatusEvent {
    pub identity: RuntimeIdentity,
    pub machine_name: String,
    pub status: BootstrapperStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One line of machine output, tagged with its origin.
///
/// `stream` is `None` for the workload's own stdout/stderr and carries the
/// infrastructure stream name (for example `DOCKER`) for engine chatter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeLogEvent {
    pub identity: RuntimeIdentity,
    pub machine_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    pub text: String,
    #[serde(serialize_with = "serialize_datetime")]
    pub time: DateTime<Utc>,
}

/// Everything the coordinator publishes on its bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    MachineStatus(MachineStatusEvent),
    InstallerStatus(InstallerStatusEvent),
    BootstrapperStatus(BootstrapperStatusEvent),
    Log(RuntimeLogEvent),
}

// Serialize DateTime as RFC 3339 / ISO 8601 string
fn serialize_datetime<S>(dt: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&dt.to_rfc3339())
}
