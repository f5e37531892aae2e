//! Dependency Coordinates
//!
//! Gradle-style `group:name[:version]` references to upstream artifacts.

use std::fmt;
use std::str::FromStr;
use serde::Deserialize;

use crate::error::CoreError;

/// Suffix marking a mutable dependency reference
pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// A declared upstream dependency
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Dependency {
    /// Artifact group, e.g. `com.discord`
    pub group: String,
    /// Artifact name, e.g. `discord`
    pub name: String,
    /// Version string as written, if any
    pub version: Option<String>,
}

impl Dependency {
    /// Create a dependency reference
    pub fn new(group: &str, name: &str, version: Option<&str>) -> Self {
        Self {
            group: group.to_string(),
            name: name.to_string(),
            version: version.map(str::to_string),
        }
    }

    /// Check whether this dependency points at `group:name`
    pub fn matches(&self, group: &str, name: &str) -> bool {
        self.group == group && self.name == name
    }

    /// Whether the version is a mutable snapshot reference
    pub fn is_snapshot(&self) -> bool {
        self.version
            .as_deref()
            .map(|v| v.ends_with(SNAPSHOT_SUFFIX))
            .unwrap_or(false)
    }
}

impl FromStr for Dependency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();

        if parts.iter().any(|p| p.is_empty()) {
            return Err(CoreError::InvalidCoordinate(s.to_string()));
        }

        match parts.as_slice() {
            [group, name] => Ok(Self::new(group, name, None)),
            [group, name, version] => Ok(Self::new(group, name, Some(version))),
            _ => Err(CoreError::InvalidCoordinate(s.to_string())),
        }
    }
}

impl TryFrom<String> for Dependency {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}:{}:{}", self.group, self.name, version),
            None => write!(f, "{}:{}", self.group, self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_coordinate() {
        let dep: Dependency = "com.discord:discord:126021".parse().unwrap();
        assert_eq!(dep.group, "com.discord");
        assert_eq!(dep.name, "discord");
        assert_eq!(dep.version.as_deref(), Some("126021"));
        assert_eq!(dep.to_string(), "com.discord:discord:126021");
    }

    #[test]
    fn test_parse_without_version() {
        let dep: Dependency = "org.jetbrains.kotlin:kotlin-stdlib".parse().unwrap();
        assert_eq!(dep.version, None);
        assert!(dep.matches("org.jetbrains.kotlin", "kotlin-stdlib"));
    }

    #[test]
    fn test_reject_malformed() {
        assert!("discord".parse::<Dependency>().is_err());
        assert!("com.discord::1".parse::<Dependency>().is_err());
        assert!("a:b:c:d".parse::<Dependency>().is_err());
    }

    #[test]
    fn test_snapshot_detection() {
        let dep: Dependency = "com.aliucord:Aliucord:main-SNAPSHOT".parse().unwrap();
        assert!(dep.is_snapshot());

        let dep: Dependency = "com.aliucord:Aliucord:2.0.0".parse().unwrap();
        assert!(!dep.is_snapshot());
    }
}
