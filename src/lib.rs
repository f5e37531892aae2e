//! acbuild - Aliucord plugin build tool
//!
//! Packages Aliucord units (plugins, the core library and the injector)
//! into distributable bundles, aggregates them into an update catalog and
//! deploys them to devices over ADB.
//!
//! ## Architecture
//!
//! - `acbuild-core`: workspace, unit and configuration model
//! - `acbuild-manifest-manager`: version floors and plugin manifests
//! - `acbuild-build-engine`: entry point discovery, bundles and the catalog
//! - `acbuild-android-toolchain`: adb lookup and the build info endpoint
//! - `acbuild-device-bridge`: device selection, deployment and restarts

#![warn(clippy::all)]

pub mod commands;
pub mod project;

// Re-export main components for library usage
pub use acbuild_core as core;
pub use acbuild_manifest_manager as manifest;
pub use acbuild_build_engine as build;
pub use acbuild_android_toolchain as toolchain;
pub use acbuild_device_bridge as device;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = acbuild_core::APP_NAME;

/// Prelude module for convenient imports
pub mod prelude {
    pub use acbuild_core::{AppConfig, Unit, UnitKind, Workspace};
    pub use acbuild_manifest_manager::{CompatibilityFloors, PluginManifest, VersionResolver};
    pub use acbuild_build_engine::{BuildRunner, BundleAssembler, Catalog, UpdateIndexBuilder};
    pub use acbuild_android_toolchain::{AdbLocator, BuildInfoClient};
    pub use acbuild_device_bridge::{AdbClient, Deployer, DeviceSelection};
}
