//! Android Toolchain
//!
//! Handles the host-side tools acbuild talks to:
//! - Android Debug Bridge detection
//! - Latest Discord version lookup

pub mod build_info;
pub mod detector;

pub use build_info::{BuildInfo, BuildInfoClient};
pub use detector::AdbLocator;

/// Toolchain errors
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    #[error("adb not found: {0}")]
    AdbNotFound(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
