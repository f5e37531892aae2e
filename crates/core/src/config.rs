//! Workspace Configuration
//!
//! Settings read from `acbuild.toml` at the workspace root:
//! - Member unit discovery
//! - Version validation strictness
//! - Latest platform version lookup
//! - Device deployment

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{info, debug};

use crate::error::{CoreError, Result};

/// Workspace configuration file name
pub const CONFIG_FILE: &str = "acbuild.toml";

/// Where Aliucord publishes the Discord version it currently targets
pub const DEFAULT_BUILD_INFO_URL: &str =
    "https://raw.githubusercontent.com/Aliucord/Aliucord/builds/data.json";

/// How malformed version strings are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Malformed versions fail the build
    Strict,
    /// Malformed versions are dropped with a warning
    Lenient,
}

impl Strictness {
    pub fn is_strict(self) -> bool {
        self == Strictness::Strict
    }
}

/// `[workspace]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSection {
    /// Glob patterns of unit directories. Empty means auto-discovery.
    pub members: Vec<String>,
    /// Output directory for bundles and the update catalog
    pub output_dir: PathBuf,
}

impl Default for WorkspaceSection {
    fn default() -> Self {
        Self {
            members: Vec::new(),
            output_dir: PathBuf::from("build").join("outputs"),
        }
    }
}

/// `[versions]` section
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionsConfig {
    /// Strictness when packaging bundles
    pub packaging: Strictness,
    /// Strictness when aggregating the update catalog
    pub catalog: Strictness,
}

impl Default for VersionsConfig {
    fn default() -> Self {
        Self {
            packaging: Strictness::Strict,
            catalog: Strictness::Lenient,
        }
    }
}

/// `[platform]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Build info document used to resolve the float-to-latest marker
    pub build_info_url: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            build_info_url: DEFAULT_BUILD_INFO_URL.to_string(),
        }
    }
}

/// `[deploy]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Explicit adb executable
    pub adb: Option<PathBuf>,
    /// Target device serial(s), `all`, or unset for the single connected device
    pub device_serial: Option<String>,
    /// Start the app waiting for a debugger after deploying
    pub wait_for_debugger: bool,
}

/// Full contents of `acbuild.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub workspace: WorkspaceSection,
    pub versions: VersionsConfig,
    pub platform: PlatformConfig,
    pub deploy: DeployConfig,
}

impl AppConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self> {
        toml::from_str(contents).map_err(|source| CoreError::TomlParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `acbuild.toml` from a workspace root, falling back to defaults
    pub async fn load(root: &Path) -> Result<Self> {
        let config_file = root.join(CONFIG_FILE);

        if config_file.exists() {
            debug!("Loading config from {:?}", config_file);
            let contents = tokio::fs::read_to_string(&config_file).await?;
            Self::from_toml_str(&contents, &config_file)
        } else {
            info!("No {} in {:?}, using defaults", CONFIG_FILE, root);
            Ok(Self::default())
        }
    }
}
