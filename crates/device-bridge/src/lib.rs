//! acbuild Device Bridge
//!
//! Pushes built bundles to Android devices over ADB and restarts Aliucord.

pub mod adb;
pub mod deploy;
pub mod device;

pub use adb::{AdbClient, AdbError};
pub use deploy::{DeployKind, Deployer};
pub use device::{Device, DeviceSelection, DeviceState};

/// Aliucord data directory on the device
pub const REMOTE_ALIUCORD_DIR: &str = "/storage/emulated/0/Aliucord";

/// Scratch directory for component imports
pub const REMOTE_TMP: &str = "/data/local/tmp";
