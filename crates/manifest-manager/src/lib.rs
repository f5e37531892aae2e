//! acbuild Manifest Manager
//!
//! Resolves compatibility floors from a unit's upstream dependencies and
//! turns them into the plugin manifest shipped inside each bundle.

pub mod android;
pub mod manifest;
pub mod resolver;
pub mod writer;

pub use manifest::{ManifestDraft, ManifestLinks, PluginManifest};
pub use resolver::{
    Axis, CompatibilityFloors, FixedLatestVersion, LatestVersionSource, NoLatestVersion,
    VersionResolver, FLOAT_TO_LATEST, uses_float_marker,
};
pub use writer::ManifestWriter;

use acbuild_core::CoreError;

/// Manifest and version resolution errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Ambiguous dependency in unit '{unit}': {count} declarations of {axis}, expected at most one")]
    Ambiguous {
        unit: String,
        axis: Axis,
        count: usize,
    },

    #[error("Invalid {field} in unit '{unit}': \"{found}\" ({expected})")]
    InvalidVersion {
        unit: String,
        field: &'static str,
        found: String,
        expected: &'static str,
    },

    #[error("Latest platform version unavailable: {0}")]
    LatestUnavailable(String),

    #[error("Unit '{unit}' has no plugin entry point")]
    MissingEntryPoint { unit: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
