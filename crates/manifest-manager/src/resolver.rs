//! Version Resolver
//!
//! Derives the minimum upstream versions a unit needs from its declared
//! compile-only dependencies and the author's explicit overrides.
//!
//! Per axis, an explicit override wins over the dependency version, and a
//! missing declaration yields no floor at all.

use std::fmt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use acbuild_core::{Dependency, Strictness, Unit, VersionOverrides};

use crate::ManifestError;

/// Platform version meaning "whatever the core library currently targets"
pub const FLOAT_TO_LATEST: &str = "aliucord-SNAPSHOT";

static SEMVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+$").expect("version pattern is valid")
});

/// Whether `version` is a plain `major.minor.patch` triple
pub fn is_semver(version: &str) -> bool {
    SEMVER.is_match(version)
}

/// An upstream artifact a unit can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// The Discord application
    Platform,
    /// The Aliucord core library
    CoreLibrary,
    /// The Kotlin standard library
    LanguageRuntime,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Platform, Axis::CoreLibrary, Axis::LanguageRuntime];

    /// Dependency coordinate as `(group, name)`
    pub fn coordinate(self) -> (&'static str, &'static str) {
        match self {
            Axis::Platform => ("com.discord", "discord"),
            Axis::CoreLibrary => ("com.aliucord", "Aliucord"),
            Axis::LanguageRuntime => ("org.jetbrains.kotlin", "kotlin-stdlib"),
        }
    }

    /// Manifest field carrying this axis' floor
    pub fn field(self) -> &'static str {
        match self {
            Axis::Platform => "minimumDiscordVersion",
            Axis::CoreLibrary => "minimumAliucordVersion",
            Axis::LanguageRuntime => "minimumKotlinVersion",
        }
    }

    /// Declarations of this axis in a dependency set
    pub fn declarations(self, deps: &[Dependency]) -> Vec<&Dependency> {
        let (group, name) = self.coordinate();
        deps.iter().filter(|d| d.matches(group, name)).collect()
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (group, name) = self.coordinate();
        write!(f, "{}:{}", group, name)
    }
}

/// Source of the latest published platform version
pub trait LatestVersionSource: Send + Sync {
    fn latest_platform_version(&self) -> Result<u32, ManifestError>;
}

/// A latest version that was looked up ahead of time
#[derive(Debug, Clone, Copy)]
pub struct FixedLatestVersion(pub u32);

impl LatestVersionSource for FixedLatestVersion {
    fn latest_platform_version(&self) -> Result<u32, ManifestError> {
        Ok(self.0)
    }
}

/// Used when no lookup was performed
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLatestVersion;

impl LatestVersionSource for NoLatestVersion {
    fn latest_platform_version(&self) -> Result<u32, ManifestError> {
        Err(ManifestError::LatestUnavailable(format!(
            "'{}' requires a lookup that was not performed",
            FLOAT_TO_LATEST
        )))
    }
}

/// Resolved minimum upstream versions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompatibilityFloors {
    pub platform: Option<u32>,
    pub core_library: Option<String>,
    pub language_runtime: Option<String>,
}

/// Whether the platform dependency asks for the latest version
pub fn uses_float_marker(deps: &[Dependency]) -> bool {
    Axis::Platform
        .declarations(deps)
        .iter()
        .any(|d| d.version.as_deref() == Some(FLOAT_TO_LATEST))
}

/// Resolves compatibility floors for units
pub struct VersionResolver {
    strictness: Strictness,
    latest: Box<dyn LatestVersionSource>,
}

impl VersionResolver {
    /// Create a resolver without a latest-version source
    pub fn new(strictness: Strictness) -> Self {
        Self {
            strictness,
            latest: Box::new(NoLatestVersion),
        }
    }

    /// Use `source` for the float-to-latest marker
    pub fn with_latest(mut self, source: impl LatestVersionSource + 'static) -> Self {
        self.latest = Box::new(source);
        self
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Resolve the floors of a unit
    pub fn resolve_unit(&self, unit: &Unit) -> Result<CompatibilityFloors, ManifestError> {
        self.resolve(&unit.name, &unit.dependencies, &unit.overrides)
    }

    /// Resolve floors from a dependency set and explicit overrides
    pub fn resolve(
        &self,
        unit: &str,
        deps: &[Dependency],
        overrides: &VersionOverrides,
    ) -> Result<CompatibilityFloors, ManifestError> {
        let mut declared = Vec::with_capacity(Axis::ALL.len());
        for axis in Axis::ALL {
            let found = axis.declarations(deps);
            if found.len() > 1 {
                return Err(ManifestError::Ambiguous {
                    unit: unit.to_string(),
                    axis,
                    count: found.len(),
                });
            }
            declared.push(found.first().copied());
        }

        Ok(CompatibilityFloors {
            platform: self.resolve_platform(unit, declared[0], overrides.minimum_discord_version)?,
            core_library: self.resolve_semver(
                unit,
                Axis::CoreLibrary,
                declared[1],
                overrides.minimum_aliucord_version.as_deref(),
            )?,
            language_runtime: self.resolve_semver(
                unit,
                Axis::LanguageRuntime,
                declared[2],
                overrides.minimum_kotlin_version.as_deref(),
            )?,
        })
    }

    fn resolve_platform(
        &self,
        unit: &str,
        dep: Option<&Dependency>,
        explicit: Option<u32>,
    ) -> Result<Option<u32>, ManifestError> {
        if explicit.is_some() {
            return Ok(explicit);
        }

        let version = match dep.and_then(|d| d.version.as_deref()) {
            Some(version) => version,
            None => return Ok(None),
        };

        if version == FLOAT_TO_LATEST {
            warn!(
                "Unit '{}' uses {}:{}; pin a concrete Discord version instead",
                unit,
                Axis::Platform,
                FLOAT_TO_LATEST
            );
            return self.latest.latest_platform_version().map(Some);
        }

        version.parse::<u32>().map(Some).map_err(|_| ManifestError::InvalidVersion {
            unit: unit.to_string(),
            field: Axis::Platform.field(),
            found: version.to_string(),
            expected: "expected a numeric Discord version code",
        })
    }

    fn resolve_semver(
        &self,
        unit: &str,
        axis: Axis,
        dep: Option<&Dependency>,
        explicit: Option<&str>,
    ) -> Result<Option<String>, ManifestError> {
        if let Some(version) = explicit {
            if is_semver(version) {
                return Ok(Some(version.to_string()));
            }
            self.reject(unit, axis, version)?;
        }

        let dep = match dep {
            Some(dep) => dep,
            None => return Ok(None),
        };
        let version = match dep.version.as_deref() {
            Some(version) => version,
            None => return Ok(None),
        };

        if dep.is_snapshot() {
            warn!(
                "Unit '{}' depends on snapshot {}; {} will not be set",
                unit,
                dep,
                axis.field()
            );
            return Ok(None);
        }

        if is_semver(version) {
            return Ok(Some(version.to_string()));
        }

        self.reject(unit, axis, version)?;
        Ok(None)
    }

    /// Fail in strict mode, warn otherwise
    fn reject(&self, unit: &str, axis: Axis, found: &str) -> Result<(), ManifestError> {
        if self.strictness.is_strict() {
            return Err(ManifestError::InvalidVersion {
                unit: unit.to_string(),
                field: axis.field(),
                found: found.to_string(),
                expected: "expected major.minor.patch",
            });
        }

        warn!(
            "Ignoring {} \"{}\" in unit '{}': not a major.minor.patch version",
            axis.field(),
            found,
            unit
        );
        Ok(())
    }
}
