//! Toolchain Detection
//!
//! Locates the `adb` executable used for deployment.

use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use which::which;

use crate::ToolchainError;

/// Finds `adb` from configuration, an Android SDK or `PATH`
#[derive(Debug, Clone, Default)]
pub struct AdbLocator {
    explicit: Option<PathBuf>,
}

impl AdbLocator {
    /// Create a locator; `explicit` is the configured adb path, if any
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { explicit }
    }

    /// Locate adb
    pub fn locate(&self) -> Result<PathBuf, ToolchainError> {
        if let Some(path) = &self.explicit {
            if path.is_file() {
                info!("Using configured adb at {:?}", path);
                return Ok(path.clone());
            }
            return Err(ToolchainError::AdbNotFound(format!(
                "configured path {:?} does not exist",
                path
            )));
        }

        if let Some(path) = Self::locate_in(&Self::sdk_candidates()) {
            info!("Found adb at {:?}", path);
            return Ok(path);
        }

        which("adb").map_err(|_| {
            ToolchainError::AdbNotFound(
                "set [deploy] adb, ANDROID_SDK_ROOT or ANDROID_HOME, or add adb to PATH".into(),
            )
        })
    }

    /// First SDK among `sdks` that ships adb
    pub fn locate_in(sdks: &[PathBuf]) -> Option<PathBuf> {
        sdks.iter().find_map(|sdk| {
            let adb = Self::adb_in_sdk(sdk);
            debug!("Checking {:?}", adb);
            adb.is_file().then_some(adb)
        })
    }

    fn adb_in_sdk(sdk: &Path) -> PathBuf {
        let name = if cfg!(windows) { "adb.exe" } else { "adb" };
        sdk.join("platform-tools").join(name)
    }

    /// Get SDK path candidates
    fn sdk_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        // Environment variable
        if let Ok(sdk_root) = env::var("ANDROID_SDK_ROOT") {
            candidates.push(PathBuf::from(sdk_root));
        }
        if let Ok(android_home) = env::var("ANDROID_HOME") {
            candidates.push(PathBuf::from(android_home));
        }

        // Common Windows paths
        if cfg!(windows) {
            if let Some(local) = dirs::data_local_dir() {
                candidates.push(local.join("Android").join("Sdk"));
            }
        }

        // Common macOS path
        if cfg!(target_os = "macos") {
            if let Some(home) = dirs::home_dir() {
                candidates.push(home.join("Library").join("Android").join("sdk"));
            }
        }

        // Common Unix paths
        if cfg!(unix) {
            if let Some(home) = dirs::home_dir() {
                candidates.push(home.join("Android").join("Sdk"));
                candidates.push(home.join("android-sdk"));
            }
            candidates.push(PathBuf::from("/opt/android-sdk"));
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path() {
        let tmp = tempfile::tempdir().unwrap();
        let adb = tmp.path().join("adb");
        std::fs::write(&adb, b"").unwrap();

        assert_eq!(AdbLocator::new(Some(adb.clone())).locate().unwrap(), adb);

        let missing = AdbLocator::new(Some(tmp.path().join("nope"))).locate();
        assert!(matches!(missing, Err(ToolchainError::AdbNotFound(_))));
    }

    #[test]
    fn test_locate_in_sdk() {
        let tmp = tempfile::tempdir().unwrap();
        let empty = tmp.path().join("empty-sdk");
        let sdk = tmp.path().join("sdk");
        std::fs::create_dir_all(sdk.join("platform-tools")).unwrap();
        let adb = AdbLocator::adb_in_sdk(&sdk);
        std::fs::write(&adb, b"").unwrap();

        assert_eq!(AdbLocator::locate_in(&[empty.clone(), sdk]), Some(adb));
        assert_eq!(AdbLocator::locate_in(&[empty]), None);
    }

    #[test]
    fn test_sdk_candidates() {
        if cfg!(unix) {
            assert!(!AdbLocator::sdk_candidates().is_empty());
        }
    }
}
