//! acbuild Build Engine
//!
//! Turns compiled unit outputs into deployable bundles and aggregates them
//! into the `updater.json` catalog.

pub mod bundle;
pub mod catalog;
pub mod dex;
pub mod entrypoint;
pub mod runner;

pub use bundle::{BundleArtifact, BundleAssembler, BundleInputs, BundleKind};
pub use catalog::{Catalog, CatalogEntry, CatalogUnit, UpdateIndexBuilder};
pub use dex::DexScanner;
pub use entrypoint::{resolve_entry_point, EntryPointCandidate, EntryPointDiscovery};
pub use runner::{BuildOutput, BuildRunner};

use std::path::PathBuf;

use acbuild_core::CoreError;
use acbuild_manifest_manager::ManifestError;

/// Build errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Unit '{unit}': code input not found at {path:?}")]
    MissingCode { unit: String, path: PathBuf },

    #[error("Code archive {0:?} contains no .dex files")]
    EmptyCodeArchive(PathBuf),

    #[error("Unit '{unit}': bundle entry '{entry}' is produced by more than one input")]
    EntryConflict { unit: String, entry: String },

    #[error("Unit '{unit}': injector needs exactly one .dex file, found {found}")]
    InjectorInput { unit: String, found: usize },

    #[error("Unit '{unit}': no class annotated with @AliucordPlugin")]
    NoEntryPoint { unit: String },

    #[error("Unit '{unit}': multiple classes annotated with @AliucordPlugin: {}", candidates.join(", "))]
    MultipleEntryPoints { unit: String, candidates: Vec<String> },

    #[error("Unit '{unit}': {class} must not override getManifest()")]
    ReservedOverride { unit: String, class: String },

    #[error("Catalog already contains an entry named '{0}'")]
    CatalogCollision(String),

    #[error("Invalid dex file {path:?}: {message}")]
    InvalidDex { path: PathBuf, message: String },

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
