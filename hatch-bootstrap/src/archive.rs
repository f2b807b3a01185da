//! Bootstrap archive assembly.
//!
//! The injected archive is a tar.gz holding the pre-built bootstrap binary
//! and `config.json`, the JSON-serialized ordered installer list. It is
//! assembled in a temporary directory that is removed on every exit path,
//! success or failure.

use crate::error::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use hatch_environment::Installer;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::Path;

/// Directory inside the machine the archive is unpacked into.
pub const BOOTSTRAPPER_DIR: &str = "/tmp/bootstrapper";
/// Relative path of the agent binary inside the archive.
pub const BOOTSTRAPPER_BINARY: &str = "bootstrapper";
/// Relative path of the serialized installer list inside the archive.
pub const CONFIG_FILE: &str = "config.json";

/// What the bootstrap agent reads on startup: installers in launch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub installers: Vec<Installer>,
}

impl BootstrapConfig {
    pub fn new(installers: Vec<Installer>) -> Self {
        Self { installers }
    }
}

/// Builds the tar.gz to inject, returning its bytes.
///
/// `binary_path` points at the pre-built bootstrap agent on the local
/// filesystem. All intermediate files live in a scoped temp directory.
pub fn build_archive(config: &BootstrapConfig, binary_path: &Path) -> Result<Vec<u8>> {
    let staging = tempfile::Builder::new()
        .prefix("hatch-bootstrap-")
        .tempdir()?;

    let config_path = staging.path().join(CONFIG_FILE);
    fs::write(&config_path, serde_json::to_vec_pretty(config)?)?;

    let tar_path = staging.path().join("bootstrapper.tar.gz");
    {
        let file = File::create(&tar_path)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_path_with_name(binary_path, BOOTSTRAPPER_BINARY)?;
        builder.append_path_with_name(&config_path, CONFIG_FILE)?;
        builder.into_inner()?.finish()?;
    }

    let bytes = fs::read(&tar_path)?;
    Ok(bytes)
    // staging drops here, removing the tar and the temp directory
}
