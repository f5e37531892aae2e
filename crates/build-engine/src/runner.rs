//! Build Runner
//!
//! Coordinates the packaging of units and the catalog step.

use std::path::PathBuf;
use tracing::{debug, info};

use acbuild_core::config::VersionsConfig;
use acbuild_core::{Unit, UnitKind};
use acbuild_manifest_manager::{
    android, CompatibilityFloors, FixedLatestVersion, ManifestDraft, PluginManifest, VersionResolver,
};

use crate::bundle::{BundleArtifact, BundleAssembler, BundleInputs, BundleKind};
use crate::catalog::{Catalog, CatalogUnit, UpdateIndexBuilder};
use crate::dex::DexScanner;
use crate::entrypoint::{resolve_entry_point, EntryPointDiscovery};
use crate::BuildError;

/// Build output
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Unit name
    pub unit: String,
    pub kind: UnitKind,
    /// The written bundle
    pub artifact: BundleArtifact,
    /// Floors resolved for packaging
    pub floors: CompatibilityFloors,
    /// Minimum Android API level
    pub api_level: Option<u32>,
    /// Manifest packed into the bundle, plugins only
    pub manifest: Option<PluginManifest>,
}

/// Build runner that coordinates the build process
pub struct BuildRunner {
    assembler: BundleAssembler,
    packaging: VersionResolver,
    catalog: VersionResolver,
    discovery: Box<dyn EntryPointDiscovery + Send + Sync>,
}

impl BuildRunner {
    /// Create a runner writing to `output_dir`. `latest` is the looked-up
    /// platform version, if the float-to-latest marker is in use.
    pub fn new(output_dir: impl Into<PathBuf>, versions: VersionsConfig, latest: Option<u32>) -> Self {
        let resolver = |strictness| {
            let resolver = VersionResolver::new(strictness);
            match latest {
                Some(version) => resolver.with_latest(FixedLatestVersion(version)),
                None => resolver,
            }
        };

        Self {
            assembler: BundleAssembler::new(output_dir),
            packaging: resolver(versions.packaging),
            catalog: resolver(versions.catalog),
            discovery: Box::new(DexScanner::new()),
        }
    }

    /// Use a different entry point discovery
    pub fn with_discovery(mut self, discovery: impl EntryPointDiscovery + Send + Sync + 'static) -> Self {
        self.discovery = Box::new(discovery);
        self
    }

    pub fn output_dir(&self) -> PathBuf {
        self.assembler.output_dir().to_path_buf()
    }

    /// Build one unit
    pub async fn build_unit(&self, unit: &Unit) -> Result<BuildOutput, BuildError> {
        let start = std::time::Instant::now();
        info!("Building {} '{}'", unit.kind, unit.name);

        let floors = self.packaging.resolve_unit(unit)?;
        debug!("Resolved floors for {}: {:?}", unit.name, floors);

        let api_level = match unit.min_api_level {
            Some(level) => Some(level),
            None => android::min_sdk_version(unit.android_manifest_path()).await?,
        };

        let inputs = BundleInputs {
            code: unit.code_path(),
            resources: Some(unit.resources_path()),
        };

        let (artifact, manifest) = match unit.kind {
            UnitKind::Plugin => {
                let draft = ManifestDraft::new(unit, floors.clone(), api_level)?;
                if !inputs.code.exists() {
                    return Err(BuildError::MissingCode {
                        unit: unit.name.clone(),
                        path: inputs.code,
                    });
                }

                let candidates = self.discovery.discover(&inputs.code)?;
                let entry_point = resolve_entry_point(&unit.name, candidates)?;
                let manifest = draft.finish(&entry_point)?;

                let artifact = self.assembler.assemble(
                    &unit.name,
                    BundleKind::Plugin { manifest: &manifest },
                    &inputs,
                )?;
                (artifact, Some(manifest))
            }
            UnitKind::Core => (self.assembler.assemble(&unit.name, BundleKind::Core, &inputs)?, None),
            UnitKind::Injector => {
                let inputs = BundleInputs {
                    resources: None,
                    ..inputs
                };
                (self.assembler.assemble(&unit.name, BundleKind::Injector, &inputs)?, None)
            }
        };

        info!(
            "Built {} {} in {:.2}s ({} bytes)",
            unit.kind,
            unit.name,
            start.elapsed().as_secs_f64(),
            artifact.size
        );

        Ok(BuildOutput {
            unit: unit.name.clone(),
            kind: unit.kind,
            artifact,
            floors,
            api_level,
            manifest,
        })
    }

    /// Build every deployable unit and write `updater.json`
    pub async fn build_catalog(&self, units: &[Unit]) -> Result<(Catalog, PathBuf), BuildError> {
        let mut builder = UpdateIndexBuilder::new();

        for unit in units {
            if !unit.deploy {
                debug!("Skipping {}: deploy is disabled", unit.name);
                continue;
            }

            let output = self.build_unit(unit).await?;
            let floors = self.catalog.resolve_unit(unit)?;
            builder.add(CatalogUnit::from_unit(
                unit,
                floors,
                output.api_level,
                &output.artifact.path,
            ))?;
        }

        let catalog = builder.build();
        let path = catalog.write(self.assembler.output_dir())?;
        Ok((catalog, path))
    }
}
