//! acbuild Core - Workspace configuration and shared types
//!
//! This crate provides the workspace model for acbuild: configuration,
//! unit descriptors, dependency coordinates and one-time initialization.

pub mod config;
pub mod dependency;
pub mod error;
pub mod init;
pub mod project;
pub mod workspace;

pub use config::{AppConfig, Strictness};
pub use dependency::Dependency;
pub use error::{CoreError, Result};
pub use project::{Author, Unit, UnitKind, UnitLinks, VersionOverrides, UNSPECIFIED_VERSION};
pub use workspace::Workspace;

/// acbuild version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "acbuild";
