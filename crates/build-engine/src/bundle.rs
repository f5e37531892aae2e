//! Bundle Assembly
//!
//! Packs compiled code, the compiled resource archive and (for plugins) the
//! manifest into one deterministic artifact.
//!
//! Entries are stored uncompressed with the zip epoch as timestamp and fixed
//! permissions, so identical inputs always produce byte-identical bundles.

use std::collections::HashSet;
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use acbuild_core::UnitKind;
use acbuild_manifest_manager::{ManifestWriter, PluginManifest};

use crate::BuildError;

/// Name of the manifest entry inside plugin bundles
pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Resource archive entry that never makes it into a bundle
pub const EXCLUDED_RESOURCE_ENTRY: &str = "AndroidManifest.xml";

/// File name of the injector artifact
pub const INJECTOR_FILE_NAME: &str = "Injector.dex";

/// What to assemble
#[derive(Debug, Clone, Copy)]
pub enum BundleKind<'a> {
    /// Code and resources
    Core,
    /// Manifest, code and resources
    Plugin { manifest: &'a PluginManifest },
    /// A single dex file
    Injector,
}

impl BundleKind<'_> {
    pub fn unit_kind(&self) -> UnitKind {
        match self {
            BundleKind::Core => UnitKind::Core,
            BundleKind::Plugin { .. } => UnitKind::Plugin,
            BundleKind::Injector => UnitKind::Injector,
        }
    }
}

/// Compiled inputs of a unit
#[derive(Debug, Clone)]
pub struct BundleInputs {
    /// Directory, `.dex` file, or jar whose `.dex` entries are packed
    pub code: PathBuf,
    /// Compiled resource archive; missing on disk is fine
    pub resources: Option<PathBuf>,
}

/// A written bundle
#[derive(Debug, Clone)]
pub struct BundleArtifact {
    /// Output file
    pub path: PathBuf,
    pub kind: UnitKind,
    /// Entry names in archive order
    pub entries: Vec<String>,
    /// Size in bytes
    pub size: u64,
}

impl BundleArtifact {
    /// File name of the artifact
    pub fn file_name(&self) -> &str {
        self.path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
    }
}

/// Assembles bundles into an output directory
#[derive(Debug, Clone)]
pub struct BundleAssembler {
    output_dir: PathBuf,
}

impl BundleAssembler {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Assemble the bundle of `unit`
    pub fn assemble(
        &self,
        unit: &str,
        kind: BundleKind<'_>,
        inputs: &BundleInputs,
    ) -> Result<BundleArtifact, BuildError> {
        if !inputs.code.exists() {
            return Err(BuildError::MissingCode {
                unit: unit.to_string(),
                path: inputs.code.clone(),
            });
        }

        std::fs::create_dir_all(&self.output_dir)?;

        let artifact = match kind {
            BundleKind::Injector => self.copy_injector(unit, &inputs.code)?,
            BundleKind::Core => self.write_zip(unit, UnitKind::Core, None, inputs)?,
            BundleKind::Plugin { manifest } => {
                let json = ManifestWriter::new().to_bytes(manifest)?;
                self.write_zip(unit, UnitKind::Plugin, Some(json), inputs)?
            }
        };

        info!("Built {} at {:?}", artifact.kind, artifact.path);
        Ok(artifact)
    }

    fn write_zip(
        &self,
        unit: &str,
        kind: UnitKind,
        manifest: Option<Vec<u8>>,
        inputs: &BundleInputs,
    ) -> Result<BundleArtifact, BuildError> {
        let mut files: Vec<(String, Vec<u8>)> = Vec::new();

        if let Some(json) = manifest {
            files.push((MANIFEST_ENTRY.to_string(), json));
        }
        files.extend(code_entries(&inputs.code)?);
        if let Some(resources) = &inputs.resources {
            files.extend(resource_entries(resources)?);
        }

        let mut seen = HashSet::new();
        for (name, _) in &files {
            if !seen.insert(name.as_str()) {
                return Err(BuildError::EntryConflict {
                    unit: unit.to_string(),
                    entry: name.clone(),
                });
            }
        }

        let options = FileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let mut entries = Vec::with_capacity(files.len());
        for (name, data) in files {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(&data)?;
            entries.push(name);
        }
        let bytes = zip.finish()?.into_inner();

        let path = self.output_dir.join(format!("{}.zip", unit));
        std::fs::write(&path, &bytes)?;
        debug!("Wrote {} entries to {:?}", entries.len(), path);

        Ok(BundleArtifact {
            path,
            kind,
            entries,
            size: bytes.len() as u64,
        })
    }

    fn copy_injector(&self, unit: &str, code: &Path) -> Result<BundleArtifact, BuildError> {
        let dex_files: Vec<PathBuf> = if code.is_dir() {
            WalkDir::new(code)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| is_dex(p))
                .collect()
        } else if is_dex(code) {
            vec![code.to_path_buf()]
        } else {
            Vec::new()
        };

        if dex_files.len() != 1 {
            return Err(BuildError::InjectorInput {
                unit: unit.to_string(),
                found: dex_files.len(),
            });
        }

        let path = self.output_dir.join(INJECTOR_FILE_NAME);
        let size = std::fs::copy(&dex_files[0], &path)?;

        Ok(BundleArtifact {
            path,
            kind: UnitKind::Injector,
            entries: vec![INJECTOR_FILE_NAME.to_string()],
            size,
        })
    }
}

fn is_dex(path: &Path) -> bool {
    path.extension().map(|e| e == "dex").unwrap_or(false)
}

/// Code files keyed by their `/`-separated path relative to the code root,
/// in path order. An archive contributes only its `.dex` entries.
fn code_entries(code: &Path) -> Result<Vec<(String, Vec<u8>)>, BuildError> {
    if code.is_file() {
        if is_dex(code) {
            let name = code
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            return Ok(vec![(name, std::fs::read(code)?)]);
        }
        return archived_dex_entries(code);
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(code) {
        let entry = entry.map_err(|e| BuildError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(code).unwrap_or(entry.path());
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push((name, std::fs::read(entry.path())?));
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// `.dex` entries of a jar or zip code input
fn archived_dex_entries(archive: &Path) -> Result<Vec<(String, Vec<u8>)>, BuildError> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;
    let mut entries = Vec::new();

    for i in 0..zip.len() {
        let mut file = zip.by_index(i)?;
        if file.is_dir() || !file.name().ends_with(".dex") {
            continue;
        }

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        entries.push((file.name().to_string(), data));
    }

    if entries.is_empty() {
        return Err(BuildError::EmptyCodeArchive(archive.to_path_buf()));
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// Entries of the compiled resource archive, minus the Android manifest
fn resource_entries(archive: &Path) -> Result<Vec<(String, Vec<u8>)>, BuildError> {
    if !archive.is_file() {
        debug!("No resource archive at {:?}", archive);
        return Ok(Vec::new());
    }

    let mut zip = ZipArchive::new(File::open(archive)?)?;
    let mut entries = Vec::with_capacity(zip.len());

    for i in 0..zip.len() {
        let mut file = zip.by_index(i)?;
        if file.is_dir() || file.name() == EXCLUDED_RESOURCE_ENTRY {
            continue;
        }

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        entries.push((file.name().to_string(), data));
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_resource_archive(path: &Path, entries: &[(&str, &[u8])]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, data) in entries {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let mut zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect()
    }

    fn fixture(dir: &Path) -> BundleInputs {
        let code = dir.join("dex");
        fs::create_dir_all(code.join("sub")).unwrap();
        fs::write(code.join("classes.dex"), b"dex\n035\0").unwrap();
        fs::write(code.join("sub").join("extra.bin"), b"extra").unwrap();

        let resources = dir.join("res.apk");
        write_resource_archive(
            &resources,
            &[
                ("resources.arsc", b"arsc"),
                ("AndroidManifest.xml", b"<manifest/>"),
                ("res/layout/main.xml", b"layout"),
            ],
        );

        BundleInputs {
            code,
            resources: Some(resources),
        }
    }

    #[test]
    fn test_core_bundle_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let inputs = fixture(tmp.path());
        let assembler = BundleAssembler::new(tmp.path().join("out"));

        let artifact = assembler.assemble("Aliucord", BundleKind::Core, &inputs).unwrap();
        assert_eq!(artifact.path, tmp.path().join("out").join("Aliucord.zip"));
        assert_eq!(
            artifact.entries,
            vec!["classes.dex", "sub/extra.bin", "res/layout/main.xml", "resources.arsc"]
        );
        assert_eq!(entry_names(&artifact.path), artifact.entries);
    }

    #[test]
    fn test_bundling_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let inputs = fixture(tmp.path());
        let assembler = BundleAssembler::new(tmp.path().join("out"));

        let first = assembler.assemble("Core", BundleKind::Core, &inputs).unwrap();
        let first_bytes = fs::read(&first.path).unwrap();
        let second = assembler.assemble("Core", BundleKind::Core, &inputs).unwrap();
        let second_bytes = fs::read(&second.path).unwrap();

        assert_eq!(first_bytes, second_bytes);
        assert_eq!(first.size, first_bytes.len() as u64);
    }

    #[test]
    fn test_missing_resources_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let mut inputs = fixture(tmp.path());
        inputs.resources = Some(tmp.path().join("absent.apk"));
        let assembler = BundleAssembler::new(tmp.path().join("out"));

        let artifact = assembler.assemble("Core", BundleKind::Core, &inputs).unwrap();
        assert_eq!(artifact.entries, vec!["classes.dex", "sub/extra.bin"]);

        inputs.resources = None;
        let artifact = assembler.assemble("Core", BundleKind::Core, &inputs).unwrap();
        assert_eq!(artifact.entries, vec!["classes.dex", "sub/extra.bin"]);
    }

    #[test]
    fn test_stored_entries_with_fixed_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let inputs = fixture(tmp.path());
        let artifact = BundleAssembler::new(tmp.path().join("out"))
            .assemble("Core", BundleKind::Core, &inputs)
            .unwrap();

        let mut zip = ZipArchive::new(File::open(&artifact.path).unwrap()).unwrap();
        for i in 0..zip.len() {
            let file = zip.by_index(i).unwrap();
            assert_eq!(file.compression(), CompressionMethod::Stored);
            let time = file.last_modified();
            assert_eq!((time.year(), time.month(), time.day()), (1980, 1, 1));
            assert_eq!(file.unix_mode().map(|m| m & 0o777), Some(0o644));
        }
    }

    #[test]
    fn test_entry_conflict() {
        let tmp = tempfile::tempdir().unwrap();
        let mut inputs = fixture(tmp.path());
        let resources = tmp.path().join("clash.apk");
        write_resource_archive(&resources, &[("classes.dex", b"other")]);
        inputs.resources = Some(resources);

        let err = BundleAssembler::new(tmp.path().join("out"))
            .assemble("Core", BundleKind::Core, &inputs)
            .unwrap_err();
        assert!(matches!(err, BuildError::EntryConflict { ref entry, .. } if entry == "classes.dex"));
    }

    #[test]
    fn test_missing_code() {
        let tmp = tempfile::tempdir().unwrap();
        let inputs = BundleInputs {
            code: tmp.path().join("nothing"),
            resources: None,
        };

        let err = BundleAssembler::new(tmp.path())
            .assemble("Core", BundleKind::Core, &inputs)
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingCode { .. }));
    }

    #[test]
    fn test_injector_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let code = tmp.path().join("dex");
        fs::create_dir_all(&code).unwrap();
        fs::write(code.join("classes.dex"), b"injector").unwrap();

        let assembler = BundleAssembler::new(tmp.path().join("out"));
        let inputs = BundleInputs { code: code.clone(), resources: None };
        let artifact = assembler.assemble("Injector", BundleKind::Injector, &inputs).unwrap();

        assert_eq!(artifact.path, tmp.path().join("out").join(INJECTOR_FILE_NAME));
        assert_eq!(artifact.file_name(), INJECTOR_FILE_NAME);
        assert_eq!(fs::read(&artifact.path).unwrap(), b"injector");

        fs::write(code.join("classes2.dex"), b"second").unwrap();
        let err = assembler.assemble("Injector", BundleKind::Injector, &inputs).unwrap_err();
        assert!(matches!(err, BuildError::InjectorInput { found: 2, .. }));
    }

    #[test]
    fn test_code_entries_sorted_by_path() {
        let tmp = tempfile::tempdir().unwrap();
        let code = tmp.path().join("dex");
        fs::create_dir_all(code.join("a")).unwrap();
        fs::write(code.join("a").join("c.dex"), b"c").unwrap();
        fs::write(code.join("a-b.dex"), b"ab").unwrap();

        let inputs = BundleInputs { code, resources: None };
        let artifact = BundleAssembler::new(tmp.path().join("out"))
            .assemble("Core", BundleKind::Core, &inputs)
            .unwrap();
        assert_eq!(artifact.entries, vec!["a-b.dex", "a/c.dex"]);
    }

    #[test]
    fn test_jar_code_contributes_dex_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let jar = tmp.path().join("classes.jar");
        write_resource_archive(
            &jar,
            &[
                ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0"),
                ("classes2.dex", b"second"),
                ("classes.dex", b"first"),
            ],
        );

        let inputs = BundleInputs { code: jar, resources: None };
        let artifact = BundleAssembler::new(tmp.path().join("out"))
            .assemble("Core", BundleKind::Core, &inputs)
            .unwrap();
        assert_eq!(artifact.entries, vec!["classes.dex", "classes2.dex"]);

        let mut zip = ZipArchive::new(File::open(&artifact.path).unwrap()).unwrap();
        let mut data = Vec::new();
        zip.by_name("classes.dex").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"first");
    }

    #[test]
    fn test_jar_without_dex_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let jar = tmp.path().join("classes.jar");
        write_resource_archive(&jar, &[("com/example/Main.class", b"cafebabe")]);

        let inputs = BundleInputs { code: jar.clone(), resources: None };
        let err = BundleAssembler::new(tmp.path().join("out"))
            .assemble("Core", BundleKind::Core, &inputs)
            .unwrap_err();
        assert!(matches!(err, BuildError::EmptyCodeArchive(ref path) if *path == jar));
    }
}
