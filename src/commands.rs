//! CLI commands for acbuild
//!
//! Each command opens the workspace, wires the crates together and runs
//! one flow end to end.

use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use acbuild_android_toolchain::{AdbLocator, BuildInfoClient};
use acbuild_build_engine::{BuildOutput, BuildRunner};
use acbuild_core::{Unit, UnitKind, Workspace};
use acbuild_device_bridge::{AdbClient, DeployKind, Deployer, DeviceSelection};
use acbuild_manifest_manager::uses_float_marker;

/// How a unit of `kind` is installed on a device
pub fn deploy_kind(kind: UnitKind) -> DeployKind {
    match kind {
        UnitKind::Plugin => DeployKind::Plugin,
        UnitKind::Core => DeployKind::Core,
        UnitKind::Injector => DeployKind::Injector,
    }
}

/// Units named in `names`, or every unit when `names` is empty
pub fn select_units<'a>(workspace: &'a Workspace, names: &[String]) -> Result<Vec<&'a Unit>> {
    if names.is_empty() {
        return Ok(workspace.units().iter().collect());
    }

    names
        .iter()
        .map(|name| workspace.unit(name).map_err(Into::into))
        .collect()
}

/// Open the workspace at `root`
async fn open_workspace(root: &Path) -> Result<Workspace> {
    Workspace::open(root)
        .await
        .with_context(|| format!("Failed to open workspace at {:?}", root))
}

/// Create a runner for `units`, looking up the latest platform version only
/// when one of them floats to it
async fn runner_for(workspace: &Workspace, units: &[&Unit]) -> Result<BuildRunner> {
    let latest = if units.iter().any(|u| uses_float_marker(&u.dependencies)) {
        let client = BuildInfoClient::new(workspace.config.platform.build_info_url.clone())?;
        let version = client
            .latest_platform_version()
            .await
            .with_context(|| format!("Failed to fetch build info from {}", client.url()))?;
        Some(version)
    } else {
        None
    };

    Ok(BuildRunner::new(
        workspace.output_dir(),
        workspace.config.versions,
        latest,
    ))
}

/// Build command options
pub struct BuildCommand {
    pub root: PathBuf,
    /// Units to build; empty builds all of them
    pub units: Vec<String>,
}

impl BuildCommand {
    /// Execute the build command
    pub async fn execute(&self) -> Result<Vec<BuildOutput>> {
        let workspace = open_workspace(&self.root).await?;
        let units = select_units(&workspace, &self.units)?;
        if units.is_empty() {
            bail!("No units found in {:?}", workspace.root);
        }

        let runner = runner_for(&workspace, &units).await?;
        let mut outputs = Vec::with_capacity(units.len());
        for unit in units {
            let output = runner
                .build_unit(unit)
                .await
                .with_context(|| format!("Failed to build {}", unit.name))?;
            info!("Wrote {:?}", output.artifact.path);
            outputs.push(output);
        }

        Ok(outputs)
    }
}

/// Catalog command options
pub struct CatalogCommand {
    pub root: PathBuf,
}

impl CatalogCommand {
    /// Build every deployable unit and write the update catalog
    pub async fn execute(&self) -> Result<PathBuf> {
        let workspace = open_workspace(&self.root).await?;
        let units: Vec<&Unit> = workspace.units().iter().filter(|u| u.deploy).collect();

        let runner = runner_for(&workspace, &units).await?;
        let (catalog, path) = runner
            .build_catalog(workspace.units())
            .await
            .context("Failed to build the update catalog")?;

        info!("Wrote {} catalog entries to {:?}", catalog.entries().len(), path);
        Ok(path)
    }
}

/// Deploy command options
pub struct DeployCommand {
    pub root: PathBuf,
    /// Unit to deploy; defaults to the only unit in the workspace
    pub unit: Option<String>,
    /// Overrides `[deploy] device_serial`
    pub device_serial: Option<String>,
    pub wait_for_debugger: bool,
}

impl DeployCommand {
    /// Build the unit and deploy it to every selected device
    pub async fn execute(&self) -> Result<()> {
        let workspace = open_workspace(&self.root).await?;
        let unit = match &self.unit {
            Some(name) => workspace.unit(name)?,
            None => match workspace.units() {
                [unit] => unit,
                units => bail!(
                    "{} units in the workspace, name the one to deploy",
                    units.len()
                ),
            },
        };

        let runner = runner_for(&workspace, &[unit]).await?;
        let output = runner
            .build_unit(unit)
            .await
            .with_context(|| format!("Failed to build {}", unit.name))?;

        let (deployer, serials) = connect(
            &workspace,
            self.device_serial.as_deref(),
            self.wait_for_debugger,
        )
        .await?;

        let kind = deploy_kind(unit.kind);
        for serial in &serials {
            deployer
                .deploy(serial, &output.artifact.path, kind)
                .await
                .with_context(|| format!("Failed to deploy {} to {}", unit.name, serial))?;
        }

        info!("Deployed {} to {} device(s)", unit.name, serials.len());
        Ok(())
    }
}

/// Restart command options
pub struct RestartCommand {
    pub root: PathBuf,
    /// Overrides `[deploy] device_serial`
    pub device_serial: Option<String>,
    pub wait_for_debugger: bool,
}

impl RestartCommand {
    /// Force restart Aliucord on every selected device
    pub async fn execute(&self) -> Result<()> {
        let workspace = open_workspace(&self.root).await?;
        let (deployer, serials) = connect(
            &workspace,
            self.device_serial.as_deref(),
            self.wait_for_debugger,
        )
        .await?;

        for serial in &serials {
            deployer
                .restart(serial)
                .await
                .with_context(|| format!("Failed to restart Aliucord on {}", serial))?;
        }
        Ok(())
    }
}

/// Locate adb and resolve the target devices
async fn connect(
    workspace: &Workspace,
    device_serial: Option<&str>,
    wait_for_debugger: bool,
) -> Result<(Deployer, Vec<String>)> {
    let deploy = &workspace.config.deploy;
    let adb = AdbLocator::new(deploy.adb.clone()).locate()?;
    debug!("Using adb at {:?}", adb);

    let selection = DeviceSelection::from_config(device_serial.or(deploy.device_serial.as_deref()))?;
    let deployer = Deployer::new(AdbClient::new(adb), wait_for_debugger || deploy.wait_for_debugger);
    let serials = deployer.select_devices(&selection).await?;
    if serials.is_empty() {
        bail!("No online devices to deploy to");
    }

    Ok((deployer, serials))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_unit(dir: &Path, toml: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(acbuild_core::project::UNIT_FILE), toml).unwrap();
    }

    #[test]
    fn test_deploy_kinds() {
        assert_eq!(deploy_kind(UnitKind::Plugin), DeployKind::Plugin);
        assert_eq!(deploy_kind(UnitKind::Core), DeployKind::Core);
        assert_eq!(deploy_kind(UnitKind::Injector), DeployKind::Injector);
    }

    #[tokio::test]
    async fn test_select_units() {
        let tmp = TempDir::new().unwrap();
        write_unit(&tmp.path().join("Alpha"), "[unit]\nversion = \"1.0.0\"\n");
        write_unit(&tmp.path().join("Beta"), "[unit]\nversion = \"1.0.0\"\n");
        let workspace = Workspace::open(tmp.path()).await.unwrap();

        let all = select_units(&workspace, &[]).unwrap();
        assert_eq!(all.len(), 2);

        let one = select_units(&workspace, &["Beta".to_string()]).unwrap();
        assert_eq!(one[0].name, "Beta");

        assert!(select_units(&workspace, &["Gamma".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_build_fails_without_code() {
        let tmp = TempDir::new().unwrap();
        write_unit(&tmp.path().join("Alpha"), "[unit]\nversion = \"1.0.0\"\n");

        let command = BuildCommand {
            root: tmp.path().to_path_buf(),
            units: vec![],
        };
        let err = command.execute().await.unwrap_err();
        assert!(format!("{:#}", err).contains("Alpha"));
    }

    #[tokio::test]
    async fn test_deploy_requires_a_unit_name() {
        let tmp = TempDir::new().unwrap();
        write_unit(&tmp.path().join("Alpha"), "[unit]\nversion = \"1.0.0\"\n");
        write_unit(&tmp.path().join("Beta"), "[unit]\nversion = \"1.0.0\"\n");

        let command = DeployCommand {
            root: tmp.path().to_path_buf(),
            unit: None,
            device_serial: None,
            wait_for_debugger: false,
        };
        let err = command.execute().await.unwrap_err();
        assert!(err.to_string().contains("2 units"));
    }
}
