//! Plugin Manifest
//!
//! The `manifest.json` descriptor shipped as the first entry of every
//! plugin bundle.
//!
//! A manifest is built in two stages: a [`ManifestDraft`] carries everything
//! known from configuration, and [`ManifestDraft::finish`] adds the entry
//! point once the compiled code has been scanned.

use serde::{Deserialize, Serialize};
use tracing::debug;

use acbuild_core::{Author, Unit, UnitLinks};

use crate::resolver::CompatibilityFloors;
use crate::ManifestError;

/// Links shown to users
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestLinks {
    pub github: Option<String>,
    pub source: Option<String>,
}

/// Canonical plugin descriptor. Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub authors: Vec<Author>,
    pub links: ManifestLinks,
    pub changelog: Option<String>,
    pub changelog_media: Option<String>,
    /// Fully qualified entry point class
    pub plugin_class_name: String,
    pub minimum_discord_version: Option<u32>,
    pub minimum_aliucord_version: Option<String>,
    pub minimum_kotlin_version: Option<String>,
    pub minimum_api_level: Option<u32>,
    pub update_url: Option<String>,
}

/// A manifest still waiting for its entry point
#[derive(Debug, Clone)]
pub struct ManifestDraft {
    name: String,
    version: String,
    description: Option<String>,
    authors: Vec<Author>,
    links: UnitLinks,
    changelog: Option<String>,
    changelog_media: Option<String>,
    floors: CompatibilityFloors,
    api_level: Option<u32>,
}

impl ManifestDraft {
    /// Start a manifest for `unit`. Fails when the unit has no real version.
    pub fn new(
        unit: &Unit,
        floors: CompatibilityFloors,
        api_level: Option<u32>,
    ) -> Result<Self, ManifestError> {
        let version = unit.require_version()?.to_string();

        Ok(Self {
            name: unit.name.clone(),
            version,
            description: unit.description.clone(),
            authors: unit.authors.clone(),
            links: unit.links.clone(),
            changelog: unit.changelog.clone(),
            changelog_media: unit.changelog_media.clone(),
            floors,
            api_level,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn floors(&self) -> &CompatibilityFloors {
        &self.floors
    }

    pub fn links(&self) -> &UnitLinks {
        &self.links
    }

    /// Set the GitHub repository, deriving release URLs when none are set
    pub fn github(&mut self, repo: &str) -> &mut Self {
        self.links.github(repo, &self.name, &self.version);
        self
    }

    /// Complete the manifest with the plugin's entry point class
    pub fn finish(self, entry_point: &str) -> Result<PluginManifest, ManifestError> {
        let entry_point = entry_point.trim();
        if entry_point.is_empty() {
            return Err(ManifestError::MissingEntryPoint { unit: self.name });
        }

        debug!("Finished manifest for {} with entry point {}", self.name, entry_point);

        Ok(PluginManifest {
            name: self.name,
            version: self.version,
            description: self.description,
            authors: self.authors,
            links: ManifestLinks {
                github: self.links.github,
                source: self.links.source,
            },
            changelog: self.changelog,
            changelog_media: self.changelog_media,
            plugin_class_name: entry_point.to_string(),
            minimum_discord_version: self.floors.platform,
            minimum_aliucord_version: self.floors.core_library,
            minimum_kotlin_version: self.floors.language_runtime,
            minimum_api_level: self.api_level,
            update_url: self.links.update_url,
        })
    }
}
