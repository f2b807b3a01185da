//! Log and progress relay.
//!
//! Converts raw machine output into structured [`RuntimeLogEvent`]s tagged
//! with runtime identity and machine name. No buffering, no reordering:
//! events leave in the order a producer hands them in. Engine chatter on
//! the infrastructure stream gets a visible prefix so consumers can tell
//! image pull/build noise from the workload's own output.

use chrono::Utc;
use hatch_core::events::{RuntimeEvent, RuntimeLogEvent};
use hatch_core::{EventBus, RuntimeIdentity};

/// Stream name the container engine's own output arrives on.
pub const DOCKER_STREAM: &str = "DOCKER";

const DOCKER_PREFIX: &str = "[DOCKER] ";

/// A raw line of output from a machine or the engine driving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub stream: Option<String>,
    pub text: String,
}

impl LogMessage {
    pub fn workload(text: impl Into<String>) -> Self {
        Self {
            stream: None,
            text: text.into(),
        }
    }

    pub fn infrastructure(text: impl Into<String>) -> Self {
        Self {
            stream: Some(DOCKER_STREAM.to_string()),
            text: text.into(),
        }
    }
}

/// Image pull progress as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullProgress {
    pub status: String,
    pub current: u64,
    pub total: u64,
}

pub struct MachineLogRelay {
    identity: RuntimeIdentity,
    machine_name: String,
    bus: EventBus,
}

impl MachineLogRelay {
    pub fn new(identity: RuntimeIdentity, machine_name: impl Into<String>, bus: EventBus) -> Self {
        Self {
            identity,
            machine_name: machine_name.into(),
            bus,
        }
    }

    /// Publishes one output line as a structured log event.
    pub fn process(&self, message: LogMessage) {
        let text = if message.stream.as_deref() == Some(DOCKER_STREAM) {
            format!("{}{}", DOCKER_PREFIX, message.text)
        } else {
            message.text
        };

        self.bus.publish(RuntimeEvent::Log(RuntimeLogEvent {
            identity: self.identity.clone(),
            machine_name: self.machine_name.clone(),
            stream: message.stream,
            text,
            time: Utc::now(),
        }));
    }

    /// Publishes a pull-progress update as an infrastructure log line.
    pub fn update_progress(&self, progress: &PullProgress) {
        self.process(LogMessage::infrastructure(format!(
            "{} {}/{}",
            progress.status, progress.current, progress.total
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay_with_bus() -> (MachineLogRelay, tokio::sync::broadcast::Receiver<RuntimeEvent>) {
        let bus = EventBus::default();
        let rx = bus.subscribe();
        let relay = MachineLogRelay::new(
            RuntimeIdentity::new("ws1", "default", "alice"),
            "dev-machine",
            bus,
        );
        (relay, rx)
    }

    #[tokio::test]
    async fn workload_lines_pass_through_unprefixed() {
        let (relay, mut rx) = relay_with_bus();
        relay.process(LogMessage::workload("listening on :8080"));

        match rx.recv().await.unwrap() {
            RuntimeEvent::Log(event) => {
                assert_eq!(event.text, "listening on :8080");
                assert_eq!(event.stream, None);
                assert_eq!(event.machine_name, "dev-machine");
            }
            other => panic!("expected log event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn docker_stream_lines_are_prefixed() {
        let (relay, mut rx) = relay_with_bus();
        relay.process(LogMessage::infrastructure("Pulling fs layer"));

        match rx.recv().await.unwrap() {
            RuntimeEvent::Log(event) => {
                assert_eq!(event.text, "[DOCKER] Pulling fs layer");
                assert_eq!(event.stream.as_deref(), Some(DOCKER_STREAM));
            }
            other => panic!("expected log event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn pull_progress_collapses_to_a_line() {
        let (relay, mut rx) = relay_with_bus();
        relay.update_progress(&PullProgress {
            status: "Downloading".to_string(),
            current: 512,
            total: 2048,
        });

        match rx.recv().await.unwrap() {
            RuntimeEvent::Log(event) => {
                assert_eq!(event.text, "[DOCKER] Downloading 512/2048");
            }
            other => panic!("expected log event, got {:?}", other),
        }
    }
}
