//! Build Info Lookup
//!
//! Fetches the build info document published alongside Aliucord builds to
//! find the Discord version it currently targets.

use std::time::Duration;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::ToolchainError;

/// `versionCode` as published, either a number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum VersionCode {
    Number(u32),
    Text(String),
}

/// Relevant part of the build info document
#[derive(Debug, Clone, Deserialize)]
pub struct BuildInfo {
    #[serde(rename = "versionCode")]
    version_code: VersionCode,
}

impl BuildInfo {
    /// Parse a build info document
    pub fn from_json(json: &str) -> Result<Self, ToolchainError> {
        serde_json::from_str(json).map_err(|e| ToolchainError::InvalidResponse(e.to_string()))
    }

    /// The Discord version code
    pub fn version_code(&self) -> Result<u32, ToolchainError> {
        match &self.version_code {
            VersionCode::Number(code) => Ok(*code),
            VersionCode::Text(text) => text.trim().parse().map_err(|_| {
                ToolchainError::InvalidResponse(format!("Invalid Discord APK version code: {}", text))
            }),
        }
    }
}

/// HTTP client for the build info document
pub struct BuildInfoClient {
    client: Client,
    url: String,
}

impl BuildInfoClient {
    /// Create a client for `url`
    pub fn new(url: impl Into<String>) -> Result<Self, ToolchainError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("acbuild/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the Discord version the core library currently targets
    pub async fn latest_platform_version(&self) -> Result<u32, ToolchainError> {
        debug!("Fetching build info from {}", self.url);

        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let version = BuildInfo::from_json(&body)?.version_code()?;
        info!("Latest Discord version is {}", version);
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_version_code() {
        let info = BuildInfo::from_json(r#"{"versionCode":"126021","versionName":"126.21 - Stable"}"#).unwrap();
        assert_eq!(info.version_code().unwrap(), 126021);
    }

    #[test]
    fn test_numeric_version_code() {
        let info = BuildInfo::from_json(r#"{"versionCode":126021}"#).unwrap();
        assert_eq!(info.version_code().unwrap(), 126021);
    }

    #[test]
    fn test_invalid_version_code() {
        let info = BuildInfo::from_json(r#"{"versionCode":"126.21"}"#).unwrap();
        assert!(matches!(info.version_code(), Err(ToolchainError::InvalidResponse(_))));

        assert!(BuildInfo::from_json("{}").is_err());
    }

    #[test]
    fn test_client_keeps_url() {
        let client = BuildInfoClient::new("https://example.com/data.json").unwrap();
        assert_eq!(client.url(), "https://example.com/data.json");
    }
}
