//! Unit Descriptors
//!
//! A unit is one independently buildable component (plugin, core library
//! or injector), described by a `unit.toml` file in its own directory.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dependency::Dependency;
use crate::error::{CoreError, Result};

/// Unit descriptor file name
pub const UNIT_FILE: &str = "unit.toml";

/// Version placeholder used when a unit never declared one
pub const UNSPECIFIED_VERSION: &str = "unspecified";

/// What a unit packages into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// A plugin bundle with its own manifest
    #[default]
    Plugin,
    /// The core library bundle
    Core,
    /// The injector dex
    Injector,
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UnitKind::Plugin => "plugin",
            UnitKind::Core => "core",
            UnitKind::Injector => "injector",
        };
        f.write_str(name)
    }
}

/// Plugin author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Display name
    pub name: String,
    /// Discord user id, 0 when unknown
    #[serde(default)]
    pub id: i64,
    /// Whether clients should link to the author's profile
    #[serde(default = "default_true")]
    pub hyperlink: bool,
}

impl Author {
    pub fn new(name: impl Into<String>, id: i64) -> Self {
        Self {
            name: name.into(),
            id,
            hyperlink: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Published links of a unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitLinks {
    /// GitHub repository
    pub github: Option<String>,
    /// Source code location
    pub source: Option<String>,
    /// Where the built bundle is downloaded from
    pub build_url: Option<String>,
    /// Where the update catalog is downloaded from
    pub update_url: Option<String>,
}

impl UnitLinks {
    /// Set the GitHub repository and derive release URLs from it.
    ///
    /// The build and update URLs are only derived when neither is set yet;
    /// an explicit value is never overwritten.
    pub fn github(&mut self, repo: &str, name: &str, version: &str) {
        let repo = repo.trim_end_matches('/');
        self.github = Some(repo.to_string());

        if self.build_url.is_none() && self.update_url.is_none() {
            self.build_url = Some(format!("{}/releases/download/{}/{}.zip", repo, version, name));
            self.update_url = Some(format!("{}/releases/latest/download/updater.json", repo));
        }
    }

    /// Build URL with the legacy `%s` placeholder, which clients substitute
    /// with the unit name themselves
    pub fn has_name_placeholder(&self) -> bool {
        self.build_url
            .as_deref()
            .map(|url| url.contains("%s"))
            .unwrap_or(false)
    }
}

/// Explicit compatibility floors set by the unit author
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionOverrides {
    pub minimum_discord_version: Option<u32>,
    pub minimum_aliucord_version: Option<String>,
    pub minimum_kotlin_version: Option<String>,
}

/// Locations of the compiled inputs, relative to the unit directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitPaths {
    /// Compiled dex output (directory, `.dex` file or jar)
    pub code: PathBuf,
    /// Compiled resource archive, optional on disk
    pub resources: PathBuf,
    /// Processed AndroidManifest.xml
    pub android_manifest: PathBuf,
}

impl Default for UnitPaths {
    fn default() -> Self {
        let intermediates = PathBuf::from("build").join("intermediates");
        Self {
            code: intermediates.join("dex"),
            resources: intermediates.join("res.apk"),
            android_manifest: intermediates.join("AndroidManifest.xml"),
        }
    }
}

/// `[unit]` table of unit.toml
#[derive(Debug, Deserialize)]
struct UnitSection {
    name: Option<String>,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    kind: UnitKind,
    description: Option<String>,
    #[serde(default)]
    authors: Vec<Author>,
    #[serde(default = "default_true")]
    deploy: bool,
    #[serde(default)]
    deploy_hidden: bool,
    changelog: Option<String>,
    changelog_media: Option<String>,
    github: Option<String>,
    source_url: Option<String>,
    build_url: Option<String>,
    update_url: Option<String>,
    min_api_level: Option<u32>,
}

fn default_version() -> String {
    UNSPECIFIED_VERSION.to_string()
}

/// `[dependencies]` table of unit.toml
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DependenciesSection {
    compile_only: Vec<Dependency>,
}

/// Raw unit.toml document
#[derive(Debug, Deserialize)]
struct UnitFile {
    unit: UnitSection,
    #[serde(default)]
    overrides: VersionOverrides,
    #[serde(default)]
    dependencies: DependenciesSection,
    #[serde(default)]
    paths: UnitPaths,
}

/// A buildable unit
#[derive(Debug, Clone)]
pub struct Unit {
    /// Unit name, also the bundle file stem and catalog key
    pub name: String,
    /// Version, `"unspecified"` until the author sets one
    pub version: String,
    /// Packaging kind
    pub kind: UnitKind,
    pub description: Option<String>,
    pub authors: Vec<Author>,
    pub links: UnitLinks,
    pub changelog: Option<String>,
    pub changelog_media: Option<String>,
    /// Whether the unit is published to the update catalog
    pub deploy: bool,
    /// Published but hidden from clients
    pub deploy_hidden: bool,
    /// Configured minimum Android API level
    pub min_api_level: Option<u32>,
    pub overrides: VersionOverrides,
    /// Compile-only dependencies
    pub dependencies: Vec<Dependency>,
    /// Unit directory
    pub root: PathBuf,
    pub paths: UnitPaths,
}

impl Unit {
    /// Create a plugin unit with default settings
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            version: UNSPECIFIED_VERSION.to_string(),
            kind: UnitKind::Plugin,
            description: None,
            authors: Vec::new(),
            links: UnitLinks::default(),
            changelog: None,
            changelog_media: None,
            deploy: true,
            deploy_hidden: false,
            min_api_level: None,
            overrides: VersionOverrides::default(),
            dependencies: Vec::new(),
            root: root.into(),
            paths: UnitPaths::default(),
        }
    }

    /// Load the unit described by `{dir}/unit.toml`
    pub async fn load(dir: &Path) -> Result<Self> {
        let file = dir.join(UNIT_FILE);
        if !file.exists() {
            return Err(CoreError::NotFound(format!("{:?}", file)));
        }

        debug!("Loading unit from {:?}", file);
        let contents = tokio::fs::read_to_string(&file).await?;
        let unit = Self::from_toml_str(&contents, dir)?;

        info!("Loaded {} unit '{}' ({})", unit.kind, unit.name, unit.version);
        Ok(unit)
    }

    /// Parse a unit from unit.toml text; `dir` is the unit directory
    pub fn from_toml_str(contents: &str, dir: &Path) -> Result<Self> {
        let raw: UnitFile = toml::from_str(contents).map_err(|source| CoreError::TomlParse {
            path: dir.join(UNIT_FILE),
            source,
        })?;

        let section = raw.unit;
        let name = match section.name {
            Some(name) => name,
            None => dir
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| CoreError::Config(format!("Cannot infer unit name from {:?}", dir)))?,
        };

        if name.trim().is_empty() {
            return Err(CoreError::Config(format!("Unit in {:?} has an empty name", dir)));
        }

        let mut links = UnitLinks {
            github: None,
            source: section.source_url,
            build_url: section.build_url,
            update_url: section.update_url,
        };
        if let Some(repo) = section.github.as_deref() {
            links.github(repo, &name, &section.version);
        }

        Ok(Self {
            name,
            version: section.version,
            kind: section.kind,
            description: section.description,
            authors: section.authors,
            links,
            changelog: section.changelog,
            changelog_media: section.changelog_media,
            deploy: section.deploy,
            deploy_hidden: section.deploy_hidden,
            min_api_level: section.min_api_level,
            overrides: raw.overrides,
            dependencies: raw.dependencies.compile_only,
            root: dir.to_path_buf(),
            paths: raw.paths,
        })
    }

    /// The version, unless it is missing, empty or the placeholder
    pub fn require_version(&self) -> Result<&str> {
        let version = self.version.trim();
        if version.is_empty() || version == UNSPECIFIED_VERSION {
            return Err(CoreError::Unversioned {
                unit: self.name.clone(),
                found: self.version.clone(),
            });
        }
        Ok(version)
    }

    /// Absolute path of the compiled code input
    pub fn code_path(&self) -> PathBuf {
        self.root.join(&self.paths.code)
    }

    /// Absolute path of the resource archive input
    pub fn resources_path(&self) -> PathBuf {
        self.root.join(&self.paths.resources)
    }

    /// Absolute path of the processed AndroidManifest.xml
    pub fn android_manifest_path(&self) -> PathBuf {
        self.root.join(&self.paths.android_manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_unit() {
        let unit = Unit::from_toml_str("[unit]\n", Path::new("plugins/MyPlugin")).unwrap();
        assert_eq!(unit.name, "MyPlugin");
        assert_eq!(unit.version, UNSPECIFIED_VERSION);
        assert_eq!(unit.kind, UnitKind::Plugin);
        assert!(unit.deploy);
        assert!(!unit.deploy_hidden);
        assert!(unit.dependencies.is_empty());
        assert_eq!(unit.paths, UnitPaths::default());
        assert!(unit.require_version().is_err());
    }

    #[test]
    fn test_full_unit() {
        let toml = r#"
            [unit]
            name = "example-plugin"
            version = "1.2.0"
            description = "Does things"
            github = "https://github.com/Org/Repo"

            [[unit.authors]]
            name = "Someone"
            id = 123456789

            [overrides]
            minimum_aliucord_version = "2.1.0"

            [dependencies]
            compile_only = ["com.discord:discord:126021"]

            [paths]
            code = "out/classes.dex"
        "#;

        let unit = Unit::from_toml_str(toml, Path::new("plugins/x")).unwrap();
        assert_eq!(unit.name, "example-plugin");
        assert_eq!(unit.require_version().unwrap(), "1.2.0");
        assert_eq!(unit.authors, vec![Author::new("Someone", 123456789)]);
        assert_eq!(unit.overrides.minimum_aliucord_version.as_deref(), Some("2.1.0"));
        assert_eq!(unit.dependencies.len(), 1);
        assert!(unit.dependencies[0].matches("com.discord", "discord"));
        assert_eq!(unit.code_path(), Path::new("plugins/x").join("out/classes.dex"));
        assert_eq!(
            unit.links.build_url.as_deref(),
            Some("https://github.com/Org/Repo/releases/download/1.2.0/example-plugin.zip")
        );
    }

    #[test]
    fn test_invalid_dependency_rejected() {
        let toml = "[unit]\n[dependencies]\ncompile_only = [\"nope\"]\n";
        assert!(Unit::from_toml_str(toml, Path::new("p")).is_err());
    }

    #[test]
    fn test_github_derives_links() {
        let mut links = UnitLinks::default();
        links.github("https://github.com/Org/Repo", "MyPlugin", "1.0.0");

        assert_eq!(links.github.as_deref(), Some("https://github.com/Org/Repo"));
        assert_eq!(
            links.build_url.as_deref(),
            Some("https://github.com/Org/Repo/releases/download/1.0.0/MyPlugin.zip")
        );
        assert_eq!(
            links.update_url.as_deref(),
            Some("https://github.com/Org/Repo/releases/latest/download/updater.json")
        );
    }

    #[test]
    fn test_github_keeps_explicit_urls() {
        let mut links = UnitLinks {
            update_url: Some("https://example.com/updater.json".to_string()),
            ..Default::default()
        };
        links.github("https://github.com/Org/Repo", "MyPlugin", "1.0.0");

        assert_eq!(links.update_url.as_deref(), Some("https://example.com/updater.json"));
        assert_eq!(links.build_url, None);

        links.build_url = Some("https://example.com/%s.zip".to_string());
        links.github("https://github.com/Org/Other", "MyPlugin", "1.0.1");
        assert_eq!(links.build_url.as_deref(), Some("https://example.com/%s.zip"));
        assert!(links.has_name_placeholder());
    }

    #[test]
    fn test_sentinel_version() {
        let mut unit = Unit::new("p", "p");
        assert!(matches!(unit.require_version(), Err(CoreError::Unversioned { .. })));

        unit.version = String::new();
        assert!(unit.require_version().is_err());

        unit.version = "0.0.1".to_string();
        assert_eq!(unit.require_version().unwrap(), "0.0.1");
    }

    #[tokio::test]
    async fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(UNIT_FILE), "[unit]\nname = \"Core\"\nkind = \"core\"\n")
            .await
            .unwrap();

        let unit = Unit::load(dir.path()).await.unwrap();
        assert_eq!(unit.kind, UnitKind::Core);
        assert_eq!(unit.root, dir.path());

        let missing = Unit::load(&dir.path().join("nope")).await;
        assert!(matches!(missing, Err(CoreError::NotFound(_))));
    }
}
