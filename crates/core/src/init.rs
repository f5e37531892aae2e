//! One-time Initialization
//!
//! Process-wide setup steps that must run at most once.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use once_cell::sync::{Lazy, OnceCell};
use tracing::{debug, info};

use crate::error::Result;

/// Legacy cache of Discord downloads kept under the Gradle user home by
/// pre-v2 builds, `caches/aliucord/discord/discord-{version}.{apk,jar}`
pub static LEGACY_CACHE: Lazy<Option<LegacyCachePurge>> = Lazy::new(|| {
    gradle_user_home(std::env::var_os("GRADLE_USER_HOME"), dirs::home_dir())
        .map(|home| LegacyCachePurge::new(home.join("caches").join("aliucord")))
});

/// Delete the legacy download cache, once per process
pub fn purge_legacy_cache() -> Result<bool> {
    match LEGACY_CACHE.as_ref() {
        Some(purge) => purge.run(),
        None => {
            debug!("No home directory, skipping legacy cache purge");
            Ok(false)
        }
    }
}

/// `GRADLE_USER_HOME` when set, else `~/.gradle`
pub fn gradle_user_home(env: Option<OsString>, home: Option<PathBuf>) -> Option<PathBuf> {
    match env {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => home.map(|home| home.join(".gradle")),
    }
}

/// Removes the stale download cache left by older releases
#[derive(Debug)]
pub struct LegacyCachePurge {
    dir: PathBuf,
    done: OnceCell<()>,
}

impl LegacyCachePurge {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            done: OnceCell::new(),
        }
    }

    /// Cache directory being purged
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run the purge. Returns `false` when it already ran in this process.
    /// A failed purge leaves the guard unset.
    pub fn run(&self) -> Result<bool> {
        let mut ran = false;
        self.done.get_or_try_init(|| {
            self.purge()?;
            ran = true;
            Ok::<_, crate::error::CoreError>(())
        })?;
        Ok(ran)
    }

    fn purge(&self) -> Result<()> {
        if !self.dir.is_dir() {
            debug!("No legacy cache at {:?}", self.dir);
            return Ok(());
        }

        std::fs::remove_dir_all(&self.dir)?;
        info!("Removed legacy cache {:?}", self.dir);
        Ok(())
    }
}
