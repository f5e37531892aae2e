//! Manifest Writer
//!
//! Reads and writes `manifest.json` in its canonical compact encoding.

use std::path::Path;
use tracing::info;

use crate::manifest::PluginManifest;
use crate::ManifestError;

/// Manifest writer
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestWriter;

impl ManifestWriter {
    pub fn new() -> Self {
        Self
    }

    /// Serialize to compact JSON
    pub fn to_string(&self, manifest: &PluginManifest) -> Result<String, ManifestError> {
        Ok(serde_json::to_string(manifest)?)
    }

    /// Serialize to compact JSON bytes
    pub fn to_bytes(&self, manifest: &PluginManifest) -> Result<Vec<u8>, ManifestError> {
        Ok(serde_json::to_vec(manifest)?)
    }

    /// Write manifest to a file
    pub async fn write_to_file(
        &self,
        manifest: &PluginManifest,
        path: impl AsRef<Path>,
    ) -> Result<(), ManifestError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(path, self.to_bytes(manifest)?).await?;
        info!("Wrote manifest to {:?}", path);
        Ok(())
    }

    /// Read a manifest back from a file
    pub async fn read_from_file(&self, path: impl AsRef<Path>) -> Result<PluginManifest, ManifestError> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestLinks;
    use acbuild_core::Author;

    fn sample() -> PluginManifest {
        PluginManifest {
            name: "Sample".to_string(),
            version: "1.0.0".to_string(),
            description: Some("A sample".to_string()),
            authors: vec![Author::new("Someone", 42)],
            links: ManifestLinks::default(),
            changelog: None,
            changelog_media: None,
            plugin_class_name: "com.example.Sample".to_string(),
            minimum_discord_version: Some(126021),
            minimum_aliucord_version: None,
            minimum_kotlin_version: None,
            minimum_api_level: Some(21),
            update_url: None,
        }
    }

    #[test]
    fn test_compact_output() {
        let json = ManifestWriter::new().to_string(&sample()).unwrap();
        assert!(!json.contains('\n'));
        assert!(json.contains(r#""authors":[{"name":"Someone","id":42,"hyperlink":true}]"#));
    }

    #[tokio::test]
    async fn test_write_and_read_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out").join("manifest.json");
        let writer = ManifestWriter::new();

        writer.write_to_file(&sample(), &path).await.unwrap();
        let read = writer.read_from_file(&path).await.unwrap();
        assert_eq!(read, sample());
    }
}
