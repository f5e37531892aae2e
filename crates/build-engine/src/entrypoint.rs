//! Entry Point Discovery
//!
//! Finds the single plugin class in a unit's compiled code.

use std::path::Path;

use crate::BuildError;

/// Annotation marking a plugin's entry point class
pub const PLUGIN_ANNOTATION: &str = "Lcom/aliucord/annotations/AliucordPlugin;";

/// Method plugins must not override
pub const RESERVED_METHOD: &str = "getManifest";

/// Descriptor of the reserved method
pub const RESERVED_METHOD_DESCRIPTOR: &str = "()Lcom/aliucord/entities/Plugin$Manifest;";

/// An annotated class found in compiled code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPointCandidate {
    /// Dotted class name
    pub class_name: String,
    /// Whether the class declares the reserved method
    pub overrides_reserved: bool,
}

impl EntryPointCandidate {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            overrides_reserved: false,
        }
    }
}

/// Something that can list plugin classes in compiled code
pub trait EntryPointDiscovery {
    fn discover(&self, code: &Path) -> Result<Vec<EntryPointCandidate>, BuildError>;
}

/// Pick the entry point out of the discovered candidates
pub fn resolve_entry_point(
    unit: &str,
    candidates: Vec<EntryPointCandidate>,
) -> Result<String, BuildError> {
    let mut candidates = candidates;

    match candidates.len() {
        0 => Err(BuildError::NoEntryPoint {
            unit: unit.to_string(),
        }),
        1 => {
            let candidate = candidates.remove(0);
            if candidate.overrides_reserved {
                return Err(BuildError::ReservedOverride {
                    unit: unit.to_string(),
                    class: candidate.class_name,
                });
            }
            Ok(candidate.class_name)
        }
        _ => Err(BuildError::MultipleEntryPoints {
            unit: unit.to_string(),
            candidates: candidates.into_iter().map(|c| c.class_name).collect(),
        }),
    }
}

/// Convert a type descriptor like `Lcom/example/Main;` to `com.example.Main`
pub fn descriptor_to_class_name(descriptor: &str) -> String {
    descriptor
        .strip_prefix('L')
        .and_then(|d| d.strip_suffix(';'))
        .unwrap_or(descriptor)
        .replace('/', ".")
}
