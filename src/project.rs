//! Workspace discovery for acbuild
//!
//! Finds the workspace a command runs against, starting from a directory
//! somewhere inside it.

use std::path::{Path, PathBuf};
use tracing::debug;

use acbuild_core::config::CONFIG_FILE;
use acbuild_core::project::UNIT_FILE;

/// What marks a directory as part of a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootMarker {
    /// Contains `acbuild.toml`
    Config,
    /// Contains `unit.toml`, a single unit workspace
    Unit,
}

/// Marker found directly in `dir`, preferring the workspace config
pub fn marker(dir: &Path) -> Option<RootMarker> {
    if dir.join(CONFIG_FILE).is_file() {
        Some(RootMarker::Config)
    } else if dir.join(UNIT_FILE).is_file() {
        Some(RootMarker::Unit)
    } else {
        None
    }
}

/// Find the workspace root for `start`.
///
/// The nearest ancestor holding `acbuild.toml` wins. Without one, the
/// nearest ancestor holding `unit.toml` is used, and failing that `start`
/// itself.
pub fn find_workspace_root(start: &Path) -> PathBuf {
    let mut nearest_unit = None;

    for dir in start.ancestors() {
        match marker(dir) {
            Some(RootMarker::Config) => {
                debug!("Found {} in {:?}", CONFIG_FILE, dir);
                return dir.to_path_buf();
            }
            Some(RootMarker::Unit) if nearest_unit.is_none() => {
                nearest_unit = Some(dir.to_path_buf());
            }
            _ => {}
        }
    }

    nearest_unit.unwrap_or_else(|| start.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_config_wins_over_unit() {
        let temp = TempDir::new().unwrap();
        let plugin = temp.path().join("MyPlugin");
        let nested = plugin.join("src").join("main");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "").unwrap();
        fs::write(plugin.join(UNIT_FILE), "version = \"1.0.0\"\n").unwrap();

        assert_eq!(marker(&plugin), Some(RootMarker::Unit));
        assert_eq!(find_workspace_root(&nested), temp.path());
    }

    #[test]
    fn test_single_unit_workspace() {
        let temp = TempDir::new().unwrap();
        let plugin = temp.path().join("MyPlugin");
        let nested = plugin.join("src");
        fs::create_dir_all(&nested).unwrap();
        fs::write(plugin.join(UNIT_FILE), "version = \"1.0.0\"\n").unwrap();

        assert_eq!(find_workspace_root(&nested), plugin);
    }

    #[test]
    fn test_falls_back_to_start() {
        let temp = TempDir::new().unwrap();
        assert_eq!(marker(temp.path()), None);
        assert_eq!(find_workspace_root(temp.path()), temp.path());
    }
}
