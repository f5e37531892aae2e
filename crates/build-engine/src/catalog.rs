//! Update Catalog
//!
//! Aggregates deployable units into `updater.json`, the index clients poll
//! to detect new versions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use acbuild_core::{CoreError, Unit, UNSPECIFIED_VERSION};
use acbuild_manifest_manager::CompatibilityFloors;

use crate::BuildError;

/// Catalog file name
pub const CATALOG_FILE: &str = "updater.json";

/// CRC-32 of `bytes` as 8 uppercase hex digits
pub fn crc32_hex(bytes: &[u8]) -> String {
    format!("{:08X}", crc32fast::hash(bytes))
}

/// One unit in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub hidden: bool,
    pub version: String,
    /// Download URL of the bundle
    #[serde(rename = "build")]
    pub build_url: Option<String>,
    pub build_crc32: String,
    pub changelog: Option<String>,
    pub changelog_media: Option<String>,
    pub minimum_discord_version: Option<u32>,
    pub minimum_aliucord_version: Option<String>,
    pub minimum_kotlin_version: Option<String>,
    pub minimum_api_level: Option<u32>,
}

/// Everything the catalog needs to know about a built unit
#[derive(Debug, Clone)]
pub struct CatalogUnit {
    pub name: String,
    pub version: String,
    pub deploy: bool,
    pub hidden: bool,
    pub build_url: Option<String>,
    pub changelog: Option<String>,
    pub changelog_media: Option<String>,
    pub floors: CompatibilityFloors,
    pub api_level: Option<u32>,
    /// Final bundle on disk
    pub bundle: PathBuf,
}

impl CatalogUnit {
    pub fn from_unit(
        unit: &Unit,
        floors: CompatibilityFloors,
        api_level: Option<u32>,
        bundle: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: unit.name.clone(),
            version: unit.version.clone(),
            deploy: unit.deploy,
            hidden: unit.deploy_hidden,
            build_url: unit.links.build_url.clone(),
            changelog: unit.changelog.clone(),
            changelog_media: unit.changelog_media.clone(),
            floors,
            api_level,
            bundle: bundle.into(),
        }
    }
}

/// Builds the catalog one unit at a time
#[derive(Debug, Default)]
pub struct UpdateIndexBuilder {
    entries: BTreeMap<String, CatalogEntry>,
}

impl UpdateIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit. Returns `false` when the unit is not deployable.
    pub fn add(&mut self, unit: CatalogUnit) -> Result<bool, BuildError> {
        if !unit.deploy {
            debug!("Skipping {}: deploy is disabled", unit.name);
            return Ok(false);
        }

        let version = unit.version.trim();
        if version.is_empty() || version == UNSPECIFIED_VERSION {
            return Err(CoreError::Unversioned {
                unit: unit.name,
                found: unit.version,
            }
            .into());
        }

        if self.entries.contains_key(&unit.name) {
            return Err(BuildError::CatalogCollision(unit.name));
        }

        let bytes = std::fs::read(&unit.bundle)?;
        let entry = CatalogEntry {
            hidden: unit.hidden,
            version: version.to_string(),
            build_url: unit.build_url,
            build_crc32: crc32_hex(&bytes),
            changelog: unit.changelog,
            changelog_media: unit.changelog_media,
            minimum_discord_version: unit.floors.platform,
            minimum_aliucord_version: unit.floors.core_library,
            minimum_kotlin_version: unit.floors.language_runtime,
            minimum_api_level: unit.api_level,
        };

        self.entries.insert(unit.name, entry);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn build(self) -> Catalog {
        Catalog {
            entries: self.entries,
        }
    }
}

/// The finished catalog, keyed by unit name in sorted order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> &BTreeMap<String, CatalogEntry> {
        &self.entries
    }

    pub fn to_json(&self) -> Result<String, BuildError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the catalog as `{dir}/updater.json`
    pub fn write(&self, dir: &Path) -> Result<PathBuf, BuildError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(CATALOG_FILE);
        std::fs::write(&path, self.to_json()?)?;

        info!("Wrote catalog with {} unit(s) to {:?}", self.entries.len(), path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn catalog_unit(dir: &Path, name: &str, version: &str) -> CatalogUnit {
        let bundle = dir.join(format!("{}.zip", name));
        fs::write(&bundle, name.as_bytes()).unwrap();

        let mut unit = Unit::new(name, dir);
        unit.version = version.to_string();
        CatalogUnit::from_unit(&unit, CompatibilityFloors::default(), None, bundle)
    }

    #[test]
    fn test_crc32_format() {
        assert_eq!(crc32_hex(b""), "00000000");
        assert_eq!(crc32_hex(b"123456789"), "CBF43926");
    }

    #[test]
    fn test_skips_non_deployable() {
        let tmp = tempfile::tempdir().unwrap();
        let mut unit = catalog_unit(tmp.path(), "Quiet", "unspecified");
        unit.deploy = false;

        let mut builder = UpdateIndexBuilder::new();
        assert!(!builder.add(unit).unwrap());
        assert!(builder.is_empty());
    }

    #[test]
    fn test_rejects_unversioned() {
        let tmp = tempfile::tempdir().unwrap();
        let mut builder = UpdateIndexBuilder::new();

        let err = builder.add(catalog_unit(tmp.path(), "Loud", "unspecified")).unwrap_err();
        assert!(matches!(err, BuildError::Core(CoreError::Unversioned { .. })));
    }

    #[test]
    fn test_rejects_collision() {
        let tmp = tempfile::tempdir().unwrap();
        let mut builder = UpdateIndexBuilder::new();

        builder.add(catalog_unit(tmp.path(), "Twin", "1.0.0")).unwrap();
        let err = builder.add(catalog_unit(tmp.path(), "Twin", "1.0.1")).unwrap_err();
        assert!(matches!(err, BuildError::CatalogCollision(ref name) if name == "Twin"));
    }

    #[test]
    fn test_sorted_encoding() {
        let tmp = tempfile::tempdir().unwrap();
        let mut builder = UpdateIndexBuilder::new();
        builder.add(catalog_unit(tmp.path(), "Zeta", "1.0.0")).unwrap();

        let mut alpha = catalog_unit(tmp.path(), "Alpha", "2.0.0");
        alpha.hidden = true;
        alpha.build_url = Some("https://example.com/%s.zip".to_string());
        alpha.floors.platform = Some(126021);
        builder.add(alpha).unwrap();

        let catalog = builder.build();
        let json = catalog.to_json().unwrap();
        assert!(json.find("\"Alpha\"").unwrap() < json.find("\"Zeta\"").unwrap());

        let alpha = catalog.get("Alpha").unwrap();
        assert!(alpha.hidden);
        assert_eq!(alpha.build_crc32, crc32_hex(b"Alpha"));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["Alpha"]["build"], "https://example.com/%s.zip");
        assert_eq!(value["Alpha"]["buildCrc32"], crc32_hex(b"Alpha").as_str());
        assert_eq!(value["Alpha"]["minimumDiscordVersion"], 126021);
        assert!(value["Zeta"]["minimumKotlinVersion"].is_null());
    }

    #[test]
    fn test_write_catalog() {
        let tmp = tempfile::tempdir().unwrap();
        let mut builder = UpdateIndexBuilder::new();
        builder.add(catalog_unit(tmp.path(), "One", "1.0.0")).unwrap();

        let path = builder.build().write(&tmp.path().join("out")).unwrap();
        assert_eq!(path.file_name().unwrap(), CATALOG_FILE);

        let read: Catalog = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read.get("One").unwrap().version, "1.0.0");
    }
}
