//! Bootstrap agent command line.

use crate::archive::{BOOTSTRAPPER_BINARY, BOOTSTRAPPER_DIR, CONFIG_FILE};
use crate::launcher::PushEndpoints;
use hatch_core::{CoordinatorConfig, RuntimeIdentity};

/// Builds the argument vector the agent is executed with inside a machine.
///
/// The runtime identity travels as the compound `workspace:environment:owner`
/// string; timeouts are passed in seconds.
pub fn bootstrap_command(
    machine_name: &str,
    identity: &RuntimeIdentity,
    endpoints: &PushEndpoints,
    config: &CoordinatorConfig,
    enable_auth: bool,
) -> Vec<String> {
    let mut command = vec![
        format!("{}/{}", BOOTSTRAPPER_DIR, BOOTSTRAPPER_BINARY),
        "-machine-name".to_string(),
        machine_name.to_string(),
        "-runtime-id".to_string(),
        identity.to_string(),
        "-push-endpoint".to_string(),
        endpoints.status.clone(),
        "-push-logs-endpoint".to_string(),
        endpoints.logs.clone(),
    ];

    if enable_auth {
        command.push("-enable-auth".to_string());
    }

    command.extend([
        "-server-check-period".to_string(),
        config.server_check_period_secs.to_string(),
        "-installer-timeout".to_string(),
        config.installer_timeout_secs.to_string(),
        "-file".to_string(),
        format!("{}/{}", BOOTSTRAPPER_DIR, CONFIG_FILE),
    ]);

    command
}
