//! Cache configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the local cache keeps its files.
///
/// The archive directory and the sidecar index are configured separately;
/// the index sits next to the directory by default, so that a deleted
/// directory with a leftover index is a detectable (and repairable) state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding the materialized archive files
    pub cache_dir: PathBuf,

    /// Path of the JSON sidecar index file
    pub index_file: PathBuf,
}

impl CacheConfig {
    /// Explicit paths.
    pub fn new(cache_dir: impl Into<PathBuf>, index_file: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            index_file: index_file.into(),
        }
    }

    /// Conventional layout under a base directory: archives in
    /// `<base>/archives`, index at `<base>/cache-index.json`.
    pub fn rooted_at(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            cache_dir: base.join("archives"),
            index_file: base.join("cache-index.json"),
        }
    }

    /// Deterministic local archive path for a module version.
    pub fn archive_path(&self, name: &str, version: &semver::Version) -> PathBuf {
        let safe_name = name.replace('/', "-");
        self.cache_dir.join(format!("{safe_name}-{version}.zip"))
    }

    /// The archive directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// The sidecar index path.
    pub fn index_path(&self) -> &Path {
        &self.index_file
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::rooted_at(default_base_dir())
    }
}

/// Default base directory (platform cache dir, `quarry` subdirectory).
fn default_base_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quarry")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_path_flattens_namespaces() {
        let config = CacheConfig::rooted_at("/tmp/quarry");
        let path = config.archive_path("org/module", &semver::Version::new(1, 2, 3));
        assert_eq!(
            path,
            PathBuf::from("/tmp/quarry/archives/org-module-1.2.3.zip")
        );
    }

    #[test]
    fn test_conventional_layout() {
        let config = CacheConfig::rooted_at("/tmp/quarry");
        assert_eq!(config.cache_dir(), Path::new("/tmp/quarry/archives"));
        assert_eq!(
            config.index_path(),
            Path::new("/tmp/quarry/cache-index.json")
        );
    }
}
