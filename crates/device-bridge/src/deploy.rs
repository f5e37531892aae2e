//! Deployment
//!
//! Installs built bundles on devices and restarts Aliucord so they load.

use std::path::Path;
use std::time::Duration;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::adb::{AdbClient, AdbError};
use crate::device::DeviceSelection;
use crate::{REMOTE_ALIUCORD_DIR, REMOTE_TMP};

/// Aliucord's main activity
const ALIUCORD_ACTIVITY: &str = "com.aliucord/com.discord.app.AppActivity$Main";

/// Aliucord Manager's entry activity
const MANAGER_ACTIVITY: &str = "com.aliucord.manager/.MainActivity";

/// Intent action asking the manager to import a component
const IMPORT_COMPONENT_ACTION: &str = "com.aliucord.manager.IMPORT_COMPONENT";

/// How long the manager gets to import a pushed component
const IMPORT_GRACE: Duration = Duration::from_secs(2);

/// How an artifact is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployKind {
    /// Replaces the core library loaded from storage
    Core,
    /// Installs into the plugins directory
    Plugin,
    /// Handed to Aliucord Manager for import
    Injector,
}

impl DeployKind {
    /// Whether Aliucord must be restarted to pick up the artifact
    pub fn needs_restart(self) -> bool {
        !matches!(self, DeployKind::Injector)
    }
}

/// Remote path the artifact is pushed to
pub fn remote_path(kind: DeployKind, file_name: &str) -> String {
    match kind {
        DeployKind::Core => format!("{}/Aliucord.zip", REMOTE_ALIUCORD_DIR),
        DeployKind::Plugin => format!("{}/plugins/{}", REMOTE_ALIUCORD_DIR, file_name),
        DeployKind::Injector => format!("{}/{}", REMOTE_TMP, file_name),
    }
}

/// Settings flag enabling the artifact, if any
pub fn settings_key(kind: DeployKind, file_name: &str) -> Option<String> {
    match kind {
        DeployKind::Core => Some("AC_from_storage".to_string()),
        DeployKind::Plugin => {
            let stem = Path::new(file_name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(file_name);
            Some(format!("AC_PM_{}", stem))
        }
        DeployKind::Injector => None,
    }
}

/// `am` arguments that force-restart Aliucord
pub fn restart_args(wait_for_debugger: bool) -> Vec<String> {
    let mut args = vec![
        "start".to_string(),
        "-S".to_string(),
        "-n".to_string(),
        format!("'{}'", ALIUCORD_ACTIVITY),
    ];
    if wait_for_debugger {
        args.push("-D".to_string());
    }
    args
}

/// Set `key` to `value` in a settings document; empty input is an empty object
pub fn apply_setting(settings: &[u8], key: &str, value: Value) -> Result<Vec<u8>, AdbError> {
    let mut map: Map<String, Value> = if settings.iter().all(u8::is_ascii_whitespace) {
        Map::new()
    } else {
        match serde_json::from_slice(settings)? {
            Value::Object(map) => map,
            other => {
                return Err(AdbError::Settings(format!("expected an object, found {}", other)));
            }
        }
    };

    map.insert(key.to_string(), value);
    Ok(serde_json::to_vec(&map)?)
}

/// Deploys artifacts to devices
pub struct Deployer {
    adb: AdbClient,
    wait_for_debugger: bool,
}

impl Deployer {
    pub fn new(adb: AdbClient, wait_for_debugger: bool) -> Self {
        Self {
            adb,
            wait_for_debugger,
        }
    }

    /// Serials targeted by `selection` among connected devices
    pub async fn select_devices(&self, selection: &DeviceSelection) -> Result<Vec<String>, AdbError> {
        self.adb.start_server().await?;
        let devices = self.adb.list_devices().await?;
        for device in &devices {
            debug!("Found {} ({:?})", device.display_name(), device.state);
        }
        selection.resolve(&devices)
    }

    /// Deploy `artifact` to the device `serial`
    pub async fn deploy(&self, serial: &str, artifact: &Path, kind: DeployKind) -> Result<(), AdbError> {
        let file_name = artifact
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AdbError::CommandFailed(format!("Invalid artifact path {:?}", artifact)))?;
        let remote = remote_path(kind, file_name);

        match kind {
            DeployKind::Core | DeployKind::Plugin => {
                self.create_aliucord_dirs(serial).await?;
                self.adb.push(serial, artifact, &remote).await?;
                if let Some(key) = settings_key(kind, file_name) {
                    self.edit_settings(serial, &key, Value::Bool(true)).await?;
                }
            }
            DeployKind::Injector => {
                let file_extra = format!("'{}'", remote);
                self.adb
                    .activity_manager(
                        serial,
                        &[
                            "start",
                            "-n",
                            MANAGER_ACTIVITY,
                            "-a",
                            IMPORT_COMPONENT_ACTION,
                            "--es",
                            "aliucord.file",
                            &file_extra,
                            "--es",
                            "aliucord.componentType",
                            "injector",
                        ],
                    )
                    .await?;
                self.adb.push(serial, artifact, &remote).await?;

                tokio::time::sleep(IMPORT_GRACE).await;
                self.adb.shell_args(serial, &["rm", "-rf", &file_extra]).await?;
            }
        }

        info!("Deployed {:?} to {}", artifact, serial);

        if kind.needs_restart() {
            self.restart(serial).await?;
        }
        Ok(())
    }

    /// Force restart Aliucord on `serial`
    pub async fn restart(&self, serial: &str) -> Result<(), AdbError> {
        let args = restart_args(self.wait_for_debugger);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.adb.activity_manager(serial, &args).await?;

        info!("Restarted Aliucord on {}", serial);
        Ok(())
    }

    async fn create_aliucord_dirs(&self, serial: &str) -> Result<(), AdbError> {
        let plugins = format!("{}/plugins", REMOTE_ALIUCORD_DIR);
        let themes = format!("{}/themes", REMOTE_ALIUCORD_DIR);
        let settings = format!("{}/settings", REMOTE_ALIUCORD_DIR);

        self.adb
            .shell_args(serial, &["mkdir", "-p", &plugins, &themes, &settings])
            .await?;
        Ok(())
    }

    /// Read Aliucord's settings, set `key`, and write them back
    async fn edit_settings(&self, serial: &str, key: &str, value: Value) -> Result<(), AdbError> {
        let remote = format!("{}/settings/Aliucord.json", REMOTE_ALIUCORD_DIR);
        let scratch = tempfile::tempdir()?;
        let local = scratch.path().join("Aliucord.json");

        let current = match self.adb.pull(serial, &remote, &local).await {
            Ok(()) => tokio::fs::read(&local).await?,
            Err(AdbError::CommandFailed(message))
                if message.contains("No such file") || message.contains("does not exist") =>
            {
                debug!("No settings on {} yet", serial);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        tokio::fs::write(&local, apply_setting(&current, key, value)?).await?;
        self.adb.push(serial, &local, &remote).await?;
        self.adb.shell_args(serial, &["chmod", "660", &remote]).await?;

        debug!("Set {} in {} on {}", key, remote, serial);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_paths() {
        assert_eq!(
            remote_path(DeployKind::Core, "Aliucord-core.zip"),
            "/storage/emulated/0/Aliucord/Aliucord.zip"
        );
        assert_eq!(
            remote_path(DeployKind::Plugin, "MyPlugin.zip"),
            "/storage/emulated/0/Aliucord/plugins/MyPlugin.zip"
        );
        assert_eq!(remote_path(DeployKind::Injector, "Injector.dex"), "/data/local/tmp/Injector.dex");
    }

    #[test]
    fn test_settings_keys() {
        assert_eq!(settings_key(DeployKind::Core, "x.zip").as_deref(), Some("AC_from_storage"));
        assert_eq!(settings_key(DeployKind::Plugin, "MyPlugin.zip").as_deref(), Some("AC_PM_MyPlugin"));
        assert_eq!(settings_key(DeployKind::Injector, "Injector.dex"), None);
    }

    #[test]
    fn test_restart_args() {
        assert_eq!(
            restart_args(false),
            vec!["start", "-S", "-n", "'com.aliucord/com.discord.app.AppActivity$Main'"]
        );
        assert_eq!(restart_args(true).last().map(String::as_str), Some("-D"));
        assert!(DeployKind::Plugin.needs_restart());
        assert!(!DeployKind::Injector.needs_restart());
    }

    #[test]
    fn test_apply_setting() {
        let empty = apply_setting(b"", "AC_from_storage", Value::Bool(true)).unwrap();
        assert_eq!(empty, br#"{"AC_from_storage":true}"#);

        let existing = br#"{"AC_PM_Other":false,"theme":"dark"}"#;
        let updated = apply_setting(existing, "AC_PM_Mine", Value::Bool(true)).unwrap();
        let value: Value = serde_json::from_slice(&updated).unwrap();
        assert_eq!(value["AC_PM_Other"], false);
        assert_eq!(value["theme"], "dark");
        assert_eq!(value["AC_PM_Mine"], true);

        assert!(matches!(apply_setting(b"[1]", "k", Value::Null), Err(AdbError::Settings(_))));
    }
}
