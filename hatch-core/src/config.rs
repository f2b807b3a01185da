//! Coordinator configuration.
//!
//! All knobs can be overridden through environment variables, falling back
//! to defaults that match a single-node development deployment.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Timeouts and periods consumed by the launcher and the activity notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Hard deadline for bootstrapping a whole machine, in minutes.
    pub bootstrapping_timeout_mins: u64,
    /// Deadline for a single installer to report ready, in seconds.
    pub installer_timeout_secs: u64,
    /// Poll period for installer server checks inside the machine, in seconds.
    pub server_check_period_secs: u64,
    /// Minimum interval between immediate activity notifications, in milliseconds.
    pub activity_threshold_ms: u64,
    /// Period of the scheduled activity flush task, in seconds.
    pub activity_flush_period_secs: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bootstrapping_timeout_mins: 10,
            installer_timeout_secs: 180,
            server_check_period_secs: 3,
            activity_threshold_ms: 60_000,
            activity_flush_period_secs: 60,
        }
    }
}

impl CoordinatorConfig {
    /// Build a config from the environment, keeping defaults for anything
    /// unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bootstrapping_timeout_mins: env_u64(
                "HATCH_BOOTSTRAP_TIMEOUT_MINS",
                defaults.bootstrapping_timeout_mins,
            ),
            installer_timeout_secs: env_u64(
                "HATCH_INSTALLER_TIMEOUT_SECS",
                defaults.installer_timeout_secs,
            ),
            server_check_period_secs: env_u64(
                "HATCH_SERVER_CHECK_PERIOD_SECS",
                defaults.server_check_period_secs,
            ),
            activity_threshold_ms: env_u64(
                "HATCH_ACTIVITY_THRESHOLD_MS",
                defaults.activity_threshold_ms,
            ),
            activity_flush_period_secs: env_u64(
                "HATCH_ACTIVITY_FLUSH_PERIOD_SECS",
                defaults.activity_flush_period_secs,
            ),
        }
    }

    pub fn bootstrapping_timeout(&self) -> Duration {
        Duration::from_secs(self.bootstrapping_timeout_mins * 60)
    }

    pub fn installer_timeout(&self) -> Duration {
        Duration::from_secs(self.installer_timeout_secs)
    }

    pub fn server_check_period(&self) -> Duration {
        Duration::from_secs(self.server_check_period_secs)
    }

    pub fn activity_threshold(&self) -> Duration {
        Duration::from_millis(self.activity_threshold_ms)
    }

    pub fn activity_flush_period(&self) -> Duration {
        Duration::from_secs(self.activity_flush_period_secs)
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
