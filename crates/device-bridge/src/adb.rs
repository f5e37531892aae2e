//! ADB (Android Debug Bridge) Client
//!
//! Communicates with devices via the adb executable.

use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::device::{parse_devices, Device};

/// ADB errors
#[derive(Debug, thiserror::Error)]
pub enum AdbError {
    #[error("ADB not found at {0:?}")]
    NotFound(PathBuf),
    #[error("Device {0} is not connected")]
    DeviceNotFound(String),
    #[error("Only one ADB device should be connected, but {0} were")]
    DeviceCount(usize),
    #[error("No device serials provided to deploy to")]
    NoSerials,
    #[error("ADB command failed: {0}")]
    CommandFailed(String),
    #[error("Invalid device settings: {0}")]
    Settings(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// ADB Client
#[derive(Debug, Clone)]
pub struct AdbClient {
    adb: PathBuf,
}

impl AdbClient {
    /// Create a client for the adb executable at `adb`
    pub fn new(adb: impl Into<PathBuf>) -> Self {
        Self { adb: adb.into() }
    }

    /// Get the ADB executable path
    pub fn adb_path(&self) -> &Path {
        &self.adb
    }

    /// Run an ADB command
    async fn run(&self, args: &[&str]) -> Result<String, AdbError> {
        if !self.adb.exists() {
            return Err(AdbError::NotFound(self.adb.clone()));
        }

        debug!("adb {:?}", args);

        let output = Command::new(&self.adb)
            .args(args)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AdbError::CommandFailed(format!(
                "adb {}: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run an ADB command for a specific device
    async fn run_for_device(&self, serial: &str, args: &[&str]) -> Result<String, AdbError> {
        let mut full_args = vec!["-s", serial];
        full_args.extend(args);
        self.run(&full_args).await
    }

    /// Start the ADB server
    pub async fn start_server(&self) -> Result<(), AdbError> {
        self.run(&["start-server"]).await?;
        Ok(())
    }

    /// List connected devices
    pub async fn list_devices(&self) -> Result<Vec<Device>, AdbError> {
        let output = self.run(&["devices", "-l"]).await?;
        Ok(parse_devices(&output))
    }

    /// Run a shell command with multiple arguments
    pub async fn shell_args(&self, serial: &str, args: &[&str]) -> Result<String, AdbError> {
        let mut full_args = vec!["shell"];
        full_args.extend(args);
        self.run_for_device(serial, &full_args).await
    }

    /// Push a file to device
    pub async fn push(&self, serial: &str, local: &Path, remote: &str) -> Result<(), AdbError> {
        let local_str = local.to_string_lossy();
        self.run_for_device(serial, &["push", &local_str, remote]).await?;
        Ok(())
    }

    /// Pull a file from device
    pub async fn pull(&self, serial: &str, remote: &str, local: &Path) -> Result<(), AdbError> {
        let local_str = local.to_string_lossy();
        self.run_for_device(serial, &["pull", remote, &local_str]).await?;
        Ok(())
    }

    /// Run `am` with `args`, failing when the activity manager reports an error
    pub async fn activity_manager(&self, serial: &str, args: &[&str]) -> Result<String, AdbError> {
        let mut full_args = vec!["am"];
        full_args.extend(args);
        let output = self.shell_args(serial, &full_args).await?;

        if output.contains("Error") {
            return Err(AdbError::CommandFailed(output.trim().to_string()));
        }
        Ok(output)
    }
}
