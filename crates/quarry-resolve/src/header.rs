//! Module header model.
//!
//! The header is the small metadata document stored at the root of every
//! module archive. This layer only needs "parse these bytes into a header,
//! or fail"; the carrier is JSON.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{QuarryError, Result};

/// Parsed module metadata from an archive's header entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleHeader {
    /// Namespaced module name, e.g. `org/module`
    pub name: String,

    /// Fully-qualified version
    pub version: Version,

    /// Direct dependencies as name -> constraint
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
}

impl ModuleHeader {
    /// Parse a header from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| QuarryError::InvalidHeader(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let json = r#"{
            "name": "org/module",
            "version": "1.2.3",
            "dependencies": { "org/dep": ">=1.0.0" }
        }"#;

        let header = ModuleHeader::from_bytes(json.as_bytes()).unwrap();
        assert_eq!(header.name, "org/module");
        assert_eq!(header.version, Version::new(1, 2, 3));
        assert_eq!(header.dependencies["org/dep"], ">=1.0.0");
    }

    #[test]
    fn test_parse_header_without_dependencies() {
        let header =
            ModuleHeader::from_bytes(br#"{"name": "org/module", "version": "0.1.0"}"#).unwrap();
        assert!(header.dependencies.is_empty());
    }

    #[test]
    fn test_parse_garbage_fails() {
        let err = ModuleHeader::from_bytes(b"not json").unwrap_err();
        assert!(matches!(err, QuarryError::InvalidHeader(_)));
    }
}
