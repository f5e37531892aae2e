//! Workspace Management
//!
//! Discovers the units of a workspace and holds its configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{CoreError, Result};
use crate::project::{Unit, UnitKind, UNIT_FILE};

/// A workspace root with its configuration and member units
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Workspace root directory
    pub root: PathBuf,
    /// Parsed `acbuild.toml`
    pub config: AppConfig,
    units: Vec<Unit>,
}

impl Workspace {
    /// Open the workspace rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CoreError::NotFound(format!("Workspace root not found: {:?}", root)));
        }

        let config = AppConfig::load(&root).await?;
        Self::with_config(root, config).await
    }

    /// Open a workspace with an already loaded configuration
    pub async fn with_config(root: PathBuf, config: AppConfig) -> Result<Self> {
        let dirs = if config.workspace.members.is_empty() {
            Self::auto_members(&root)?
        } else {
            Self::glob_members(&root, &config.workspace.members)?
        };

        let mut units: Vec<Unit> = Vec::with_capacity(dirs.len());
        let mut seen: HashMap<String, PathBuf> = HashMap::new();

        for dir in dirs {
            let unit = Unit::load(&dir).await?;
            if let Some(first) = seen.get(&unit.name) {
                return Err(CoreError::DuplicateUnit {
                    name: unit.name.clone(),
                    first: first.clone(),
                    second: dir,
                });
            }
            if unit.kind == UnitKind::Injector {
                if let Some(first) = units.iter().find(|u| u.kind == UnitKind::Injector) {
                    // Both would be written to the same Injector.dex
                    return Err(CoreError::Config(format!(
                        "Only one injector unit is allowed, found '{}' and '{}'",
                        first.name, unit.name
                    )));
                }
            }
            seen.insert(unit.name.clone(), dir);
            units.push(unit);
        }

        info!("Opened workspace {:?} with {} unit(s)", root, units.len());

        Ok(Self { root, config, units })
    }

    /// Root itself and its direct children that carry a unit.toml
    fn auto_members(root: &Path) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();

        if root.join(UNIT_FILE).is_file() {
            dirs.push(root.to_path_buf());
        }

        let mut children: Vec<PathBuf> = std::fs::read_dir(root)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir() && p.join(UNIT_FILE).is_file())
            .collect();
        children.sort();
        dirs.extend(children);

        debug!("Auto-discovered {} unit dir(s)", dirs.len());
        Ok(dirs)
    }

    /// Expand the configured member globs relative to the root
    fn glob_members(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();

        for pattern in patterns {
            let full = root.join(pattern);
            let full = full.to_string_lossy();
            let paths = glob::glob(&full).map_err(|e| CoreError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;

            let mut matched = 0;
            for path in paths.filter_map(|p| p.ok()) {
                if !path.is_dir() {
                    continue;
                }
                if !path.join(UNIT_FILE).is_file() {
                    debug!("Skipping {:?}: no {}", path, UNIT_FILE);
                    continue;
                }
                if !dirs.contains(&path) {
                    dirs.push(path);
                    matched += 1;
                }
            }

            if matched == 0 {
                warn!("Member pattern '{}' matched no units", pattern);
            }
        }

        Ok(dirs)
    }

    /// All member units in discovery order
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Look up a unit by name
    pub fn unit(&self, name: &str) -> Result<&Unit> {
        self.units
            .iter()
            .find(|u| u.name == name)
            .ok_or_else(|| CoreError::NotFound(format!("No unit named '{}'", name)))
    }

    /// Directory where bundles and the catalog are written
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.config.workspace.output_dir)
    }
}
