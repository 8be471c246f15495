//! Repository index model.
//!
//! Each live repository publishes an index: a JSON list of records, one per
//! offered artifact. This crate consumes the format; producing and serving
//! it is the transport's business. Locators are opaque here; all the core
//! needs is "fetch bytes at this locator".

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One offered artifact in a repository index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRecord {
    /// Namespaced module name
    pub name: String,

    /// Fully-qualified version
    pub version: Version,

    /// Opaque locator of the module source listing
    pub source_locator: String,

    /// Hex-encoded SHA-512 of the archive bytes
    pub content_hash: String,

    /// Opaque locator of the archive
    pub archive_locator: String,
}

impl IndexRecord {
    /// Whether this record offers `module` at a version satisfying
    /// `constraint`.
    pub fn satisfies(&self, module: &str, constraint: &VersionReq) -> bool {
        self.name == module && constraint.matches(&self.version)
    }
}

/// Parse an index document (a JSON array of records).
pub fn parse(bytes: &[u8]) -> Result<Vec<IndexRecord>> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Serialize records back into an index document.
pub fn to_json(records: &[IndexRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"[
        {
            "name": "org/module",
            "version": "1.2.3",
            "sourceLocator": "modules/org/module",
            "contentHash": "abc123",
            "archiveLocator": "archives/org-module-1.2.3.zip"
        }
    ]"#;

    #[test]
    fn test_parse_index() {
        let records = parse(DOC.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "org/module");
        assert_eq!(records[0].version, Version::new(1, 2, 3));
        assert_eq!(records[0].archive_locator, "archives/org-module-1.2.3.zip");
    }

    #[test]
    fn test_wire_field_names() {
        let records = parse(DOC.as_bytes()).unwrap();
        let json = to_json(&records).unwrap();
        assert!(json.contains("sourceLocator"));
        assert!(json.contains("contentHash"));
        assert!(json.contains("archiveLocator"));
    }

    #[test]
    fn test_satisfies() {
        let record = parse(DOC.as_bytes()).unwrap().remove(0);
        assert!(record.satisfies("org/module", &"^1.0.0".parse().unwrap()));
        assert!(!record.satisfies("org/module", &"^2.0.0".parse().unwrap()));
        assert!(!record.satisfies("org/other", &"^1.0.0".parse().unwrap()));
    }
}
