//! Integration tests for the agent launcher.
//!
//! A fake machine records engine calls; a fake bootstrap agent pushes
//! installer status events onto the bus after configurable delays. Tokio's
//! paused clock makes the timeout scenarios deterministic.

use async_trait::async_trait;
use hatch_bootstrap::{
    AgentLauncher, LaunchError, LaunchPhase, Machine, MachineError, PushEndpoints,
};
use hatch_core::events::{InstallerStatus, InstallerStatusEvent, RuntimeEvent};
use hatch_core::{CoordinatorConfig, EventBus, RuntimeIdentity};
use hatch_environment::Installer;
use std::sync::Mutex;
use std::time::Duration;

struct FakeMachine {
    name: String,
    fail_put_archive: bool,
    archives: Mutex<Vec<(String, usize)>>,
    execs: Mutex<Vec<Vec<String>>>,
}

impl FakeMachine {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail_put_archive: false,
            archives: Mutex::new(Vec::new()),
            execs: Mutex::new(Vec::new()),
        }
    }

    fn failing_injection(name: &str) -> Self {
        Self {
            fail_put_archive: true,
            ..Self::new(name)
        }
    }
}

#[async_trait]
impl Machine for FakeMachine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put_archive(&self, remote_dir: &str, archive: Vec<u8>) -> Result<(), MachineError> {
        if self.fail_put_archive {
            return Err(MachineError::engine("copy rejected"));
        }
        self.archives
            .lock()
            .unwrap()
            .push((remote_dir.to_string(), archive.len()));
        Ok(())
    }

    async fn exec(&self, command: Vec<String>) -> Result<(), MachineError> {
        self.execs.lock().unwrap().push(command);
        Ok(())
    }

    async fn destroy(&self) -> Result<(), MachineError> {
        Ok(())
    }
}

fn identity() -> RuntimeIdentity {
    RuntimeIdentity::new("ws1", "default", "alice")
}

fn test_config(installer_timeout_secs: u64, bootstrapping_timeout_mins: u64) -> CoordinatorConfig {
    CoordinatorConfig {
        bootstrapping_timeout_mins,
        installer_timeout_secs,
        server_check_period_secs: 1,
        ..CoordinatorConfig::default()
    }
}

fn launcher(bus: &EventBus, config: CoordinatorConfig, binary: &std::path::Path) -> AgentLauncher {
    AgentLauncher::new(
        identity(),
        bus.clone(),
        config,
        PushEndpoints::new("wss://master/events", "wss://master/logs"),
        binary,
    )
}

fn fake_binary() -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"#!/bin/sh\nexit 0\n").unwrap();
    file
}

/// Publishes an installer status event for `machine` after `delay`.
fn push_installer_status_after(
    bus: &EventBus,
    machine: &str,
    installer_id: &str,
    status: InstallerStatus,
    delay: Duration,
) {
    let bus = bus.clone();
    let machine = machine.to_string();
    let installer_id = installer_id.to_string();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        bus.publish(RuntimeEvent::InstallerStatus(InstallerStatusEvent {
            identity: identity(),
            machine_name: machine,
            installer_id,
            status,
            error: match status {
                InstallerStatus::Failed => Some("script exited 1".to_string()),
                _ => None,
            },
        }));
    });
}

#[tokio::test(start_paused = true)]
async fn reaches_ready_when_all_installers_report_in_time() {
    let bus = EventBus::default();
    let binary = fake_binary();
    let machine = FakeMachine::new("dev-machine");
    let launcher = launcher(&bus, test_config(5, 1), binary.path());

    let installers = vec![
        Installer::new("org.hatch.jdk", "jdk.sh"),
        Installer::new("org.hatch.ws-agent", "ws-agent.sh").with_dependency("org.hatch.jdk"),
    ];

    push_installer_status_after(
        &bus,
        "dev-machine",
        "org.hatch.jdk",
        InstallerStatus::Done,
        Duration::from_secs(2),
    );
    push_installer_status_after(
        &bus,
        "dev-machine",
        "org.hatch.ws-agent",
        InstallerStatus::Running,
        Duration::from_secs(4),
    );

    launcher.launch(&machine, &installers).await.unwrap();

    assert_eq!(launcher.phase(), LaunchPhase::Ready);
    let archives = machine.archives.lock().unwrap();
    assert_eq!(archives.len(), 1);
    assert_eq!(archives[0].0, "/tmp/bootstrapper");
    let execs = machine.execs.lock().unwrap();
    assert_eq!(execs.len(), 1);
    assert!(execs[0].join(" ").contains("-runtime-id ws1:default:alice"));
}

#[tokio::test(start_paused = true)]
async fn installer_timeout_fails_fast() {
    let bus = EventBus::default();
    let binary = fake_binary();
    let machine = FakeMachine::new("dev-machine");
    // 1s installer timeout inside a 1min whole-machine deadline.
    let launcher = launcher(&bus, test_config(1, 1), binary.path());

    let installers = vec![Installer::new("org.hatch.ws-agent", "ws-agent.sh")];

    let started = tokio::time::Instant::now();
    let result = launcher.launch(&machine, &installers).await;

    // Fails at the installer timeout, well before the bootstrap deadline.
    assert!(started.elapsed() < Duration::from_secs(5));
    match result {
        Err(LaunchError::InstallerTimeout { installer, .. }) => {
            assert_eq!(installer, "org.hatch.ws-agent");
        }
        other => panic!("expected installer timeout, got {:?}", other),
    }
    assert_eq!(launcher.phase(), LaunchPhase::Failed);
}

#[tokio::test(start_paused = true)]
async fn whole_machine_deadline_wins_over_installer_progress() {
    let bus = EventBus::default();
    let binary = fake_binary();
    let machine = FakeMachine::new("dev-machine");
    // Generous per-installer timeout, 1min machine deadline.
    let launcher = launcher(&bus, test_config(50, 1), binary.path());

    let installers = vec![
        Installer::new("first", "first.sh"),
        Installer::new("second", "second.sh"),
    ];

    // First installer readies at 40s; the second would ready at 80s, past
    // the 60s machine deadline.
    push_installer_status_after(
        &bus,
        "dev-machine",
        "first",
        InstallerStatus::Done,
        Duration::from_secs(40),
    );
    push_installer_status_after(
        &bus,
        "dev-machine",
        "second",
        InstallerStatus::Done,
        Duration::from_secs(80),
    );

    match launcher.launch(&machine, &installers).await {
        Err(LaunchError::BootstrapTimeout { timeout_mins, .. }) => {
            assert_eq!(timeout_mins, 1);
        }
        other => panic!("expected bootstrap timeout, got {:?}", other),
    }
    assert_eq!(launcher.phase(), LaunchPhase::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn failed_installer_aborts_the_launch() {
    let bus = EventBus::default();
    let binary = fake_binary();
    let machine = FakeMachine::new("dev-machine");
    let launcher = launcher(&bus, test_config(10, 1), binary.path());

    let installers = vec![Installer::new("org.hatch.ws-agent", "ws-agent.sh")];

    push_installer_status_after(
        &bus,
        "dev-machine",
        "org.hatch.ws-agent",
        InstallerStatus::Failed,
        Duration::from_secs(1),
    );

    match launcher.launch(&machine, &installers).await {
        Err(LaunchError::InstallerFailed { reason, .. }) => {
            assert_eq!(reason, "script exited 1");
        }
        other => panic!("expected installer failure, got {:?}", other),
    }
    assert_eq!(launcher.phase(), LaunchPhase::Failed);
}

#[tokio::test(start_paused = true)]
async fn injection_failure_surfaces_and_skips_exec() {
    let bus = EventBus::default();
    let binary = fake_binary();
    let machine = FakeMachine::failing_injection("dev-machine");
    let launcher = launcher(&bus, test_config(5, 1), binary.path());

    let installers = vec![Installer::new("org.hatch.ws-agent", "ws-agent.sh")];

    match launcher.launch(&machine, &installers).await {
        Err(LaunchError::Injection { machine: name, .. }) => {
            assert_eq!(name, "dev-machine");
        }
        other => panic!("expected injection error, got {:?}", other),
    }
    assert_eq!(launcher.phase(), LaunchPhase::Failed);
    assert!(machine.execs.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn events_from_other_machines_are_ignored() {
    let bus = EventBus::default();
    let binary = fake_binary();
    let machine = FakeMachine::new("dev-machine");
    let launcher = launcher(&bus, test_config(2, 1), binary.path());

    let installers = vec![Installer::new("org.hatch.ws-agent", "ws-agent.sh")];

    // Same installer id, different machine: must not count as readiness.
    push_installer_status_after(
        &bus,
        "other-machine",
        "org.hatch.ws-agent",
        InstallerStatus::Done,
        Duration::from_secs(1),
    );

    assert!(matches!(
        launcher.launch(&machine, &installers).await,
        Err(LaunchError::InstallerTimeout { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn no_installers_means_nothing_to_do() {
    let bus = EventBus::default();
    let binary = fake_binary();
    let machine = FakeMachine::new("dev-machine");
    let launcher = launcher(&bus, test_config(5, 1), binary.path());

    launcher.launch(&machine, &[]).await.unwrap();

    assert_eq!(launcher.phase(), LaunchPhase::Ready);
    assert!(machine.archives.lock().unwrap().is_empty());
    assert!(machine.execs.lock().unwrap().is_empty());
}
