//! AndroidManifest.xml Reader
//!
//! Extracts the minimum API level from a processed AndroidManifest.xml.

use std::path::Path;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::ManifestError;

/// `android:minSdkVersion` of the manifest at `path`, or `None` when the file
/// does not exist or declares no minimum
pub async fn min_sdk_version(path: impl AsRef<Path>) -> Result<Option<u32>, ManifestError> {
    let path = path.as_ref();
    if !path.exists() {
        debug!("No AndroidManifest.xml at {:?}", path);
        return Ok(None);
    }

    let xml = tokio::fs::read_to_string(path).await?;
    parse_min_sdk_version(&xml)
}

/// Parse `<uses-sdk android:minSdkVersion>` from manifest XML
pub fn parse_min_sdk_version(xml: &str) -> Result<Option<u32>, ManifestError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"uses-sdk" => {
                return Ok(get_android_attr(e, "minSdkVersion").and_then(|s| s.trim().parse().ok()));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// Get an android: namespaced attribute
fn get_android_attr(e: &BytesStart, name: &str) -> Option<String> {
    let android_name = format!("android:{}", name);
    for attr in e.attributes().filter_map(|a| a.ok()) {
        let key = std::str::from_utf8(attr.key.as_ref()).ok()?;
        if key == android_name {
            return std::str::from_utf8(&attr.value).ok().map(|s| s.to_string());
        }
    }
    None
}
