//! Local cache repository.
//!
//! Layers a disk-backed materialization cache over the quorum verifier.
//! Resolution still runs against the live sources, but every returned
//! artifact is wrapped so that the first materializing call fetches the
//! archive once into the cache directory and records it in a JSON sidecar
//! index; from then on, including across process restarts, all reads are
//! served from the local file without network access.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::archive;
use crate::combined::CombinedDownloadable;
use crate::config::CacheConfig;
use crate::error::{QuarryError, Result};
use crate::header::ModuleHeader;
use crate::quorum;
use crate::source::{
    CachingRepository, Downloadable, Repository, SharedDownloadable, SharedRepository,
};

/// Persisted record of one materialized artifact.
///
/// Written once, never mutated. The local file a record points at is
/// treated as authoritative and is never re-verified or re-fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Namespaced module name
    pub name: String,

    /// Fully-qualified version
    pub version: Version,

    /// Declared hex-encoded SHA-512 of the archive, verified at write time
    pub content_hash: String,

    /// Local archive file this entry was materialized to
    pub local_file_path: PathBuf,

    /// When the artifact was materialized
    pub cached_at: DateTime<Utc>,
}

/// Shared cache state: configuration plus the guarded in-memory index.
///
/// "Append an entry, then rewrite the sidecar" is one critical section per
/// instance, so concurrent materializations of different artifacts cannot
/// corrupt each other's append. Cross-process locking is out of scope.
struct CacheState {
    config: CacheConfig,
    entries: Mutex<Vec<CacheEntry>>,
}

impl CacheState {
    /// Append a new entry and flush the whole index to the sidecar file.
    ///
    /// The entry stays in the in-memory list only if the flush succeeds; a
    /// persist failure propagates, leaving the local file on disk but
    /// unindexed (invisible, and rewritten by the next materialization).
    async fn record(&self, entry: CacheEntry) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.push(entry);

        if let Err(e) = self.flush(&entries).await {
            entries.pop();
            return Err(e);
        }
        Ok(())
    }

    async fn flush(&self, entries: &[CacheEntry]) -> Result<()> {
        let index_path = self.config.index_path();
        if let Some(parent) = index_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&index_path, content).await?;
        debug!("Rewrote cache index at {}", index_path.display());
        Ok(())
    }
}

/// A [`CachingRepository`] that memoizes materialized artifacts on disk.
pub struct LocalCacheRepository {
    name: String,
    sources: Vec<SharedRepository>,
    state: Arc<CacheState>,
}

impl std::fmt::Debug for LocalCacheRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCacheRepository")
            .field("name", &self.name)
            .field("sources", &self.sources.len())
            .finish_non_exhaustive()
    }
}

impl LocalCacheRepository {
    /// Open (or create) a cache directory and build a repository over the
    /// given live sources.
    ///
    /// - Missing cache directory: it is created; a sidecar index left over
    ///   from a deleted directory is removed first, since the files it
    ///   points at are gone.
    /// - Existing directory with a sidecar index: the index is loaded; a
    ///   malformed index is a fatal error, not silently recovered from.
    /// - Existing directory without an index: starts empty. Orphaned files
    ///   from an interrupted run are not scanned and stay invisible.
    pub fn new(
        name: impl Into<String>,
        sources: Vec<SharedRepository>,
        config: CacheConfig,
    ) -> Result<Self> {
        let index_path = config.index_path().to_path_buf();

        let entries = if !config.cache_dir().exists() {
            if index_path.exists() {
                info!(
                    "Removing stale cache index at {} (cache directory is gone)",
                    index_path.display()
                );
                std::fs::remove_file(&index_path)?;
            }
            std::fs::create_dir_all(config.cache_dir())?;
            Vec::new()
        } else if index_path.exists() {
            let content = std::fs::read_to_string(&index_path)?;
            let entries: Vec<CacheEntry> =
                serde_json::from_str(&content).map_err(|e| QuarryError::MalformedCacheIndex {
                    path: index_path.clone(),
                    reason: e.to_string(),
                })?;
            debug!(
                "Loaded {} cache entries from {}",
                entries.len(),
                index_path.display()
            );
            entries
        } else {
            Vec::new()
        };

        Ok(Self {
            name: name.into(),
            sources,
            state: Arc::new(CacheState {
                config,
                entries: Mutex::new(entries),
            }),
        })
    }

    fn wrap(&self, verified: Vec<SharedDownloadable>) -> Vec<SharedDownloadable> {
        verified
            .into_iter()
            .map(|inner| {
                Arc::new(CachedDownloadable {
                    name: inner.name().to_string(),
                    version: inner.version().clone(),
                    content_hash: inner.content_hash().to_string(),
                    inner,
                    state: Arc::clone(&self.state),
                }) as SharedDownloadable
            })
            .collect()
    }
}

#[async_trait]
impl Repository for LocalCacheRepository {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, constraint))]
    async fn find(
        &self,
        module: &str,
        constraint: &VersionReq,
    ) -> Result<Vec<SharedDownloadable>> {
        let verified = quorum::find_verified(
            &self.sources,
            module,
            constraint,
            CombinedDownloadable::combine,
        )
        .await?;
        Ok(self.wrap(verified))
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<SharedDownloadable>> {
        let verified =
            quorum::find_all_verified(&self.sources, CombinedDownloadable::combine).await?;
        Ok(self.wrap(verified))
    }

    fn is_caching(&self) -> bool {
        true
    }
}

#[async_trait]
impl CachingRepository for LocalCacheRepository {
    async fn find_all_cached(&self) -> Result<Vec<SharedDownloadable>> {
        let entries = self.state.entries.lock().await;
        Ok(entries
            .iter()
            .map(|entry| Arc::new(MaterializedArtifact { entry: entry.clone() }) as SharedDownloadable)
            .collect())
    }
}

/// Lazy cache wrapper around a verified artifact.
///
/// Identity is copied from the wrapped artifact so callers can filter and
/// sort without triggering materialization; the wrapped fetch only runs
/// the first time a materializing operation needs the local file.
struct CachedDownloadable {
    name: String,
    version: Version,
    content_hash: String,
    inner: SharedDownloadable,
    state: Arc<CacheState>,
}

impl CachedDownloadable {
    /// Ensure the deterministic local file exists, fetching through the
    /// wrapped artifact on first use.
    ///
    /// An entry is recorded only after the local write succeeded; if the
    /// live fetch fails, nothing is recorded and the next attempt retries
    /// from the network. A file already present (just written, or from a
    /// prior run) is served as-is.
    async fn materialize(&self) -> Result<PathBuf> {
        let path = self.state.config.archive_path(&self.name, &self.version);
        if path.exists() {
            return Ok(path);
        }

        debug!("Materializing {} to {}", self.coordinate(), path.display());
        self.inner.download_zip(&path).await?;

        self.state
            .record(CacheEntry {
                name: self.name.clone(),
                version: self.version.clone(),
                content_hash: self.content_hash.clone(),
                local_file_path: path.clone(),
                cached_at: Utc::now(),
            })
            .await?;

        info!("Cached {} at {}", self.coordinate(), path.display());
        Ok(path)
    }
}

#[async_trait]
impl Downloadable for CachedDownloadable {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &Version {
        &self.version
    }

    fn content_hash(&self) -> &str {
        &self.content_hash
    }

    async fn fetch_zip(&self) -> Result<Bytes> {
        let path = self.materialize().await?;
        read_local(&path).await
    }

    async fn header(&self) -> Result<ModuleHeader> {
        let path = self.materialize().await?;
        local_header(&self.name, &path).await
    }

    async fn download(&self, target_dir: &Path) -> Result<PathBuf> {
        let path = self.materialize().await?;
        local_extract(&self.name, &path, target_dir).await
    }

    async fn download_zip(&self, target_file: &Path) -> Result<()> {
        let path = self.materialize().await?;
        local_copy(&path, target_file).await
    }
}

/// An artifact already on disk, reconstructed from a cache entry.
///
/// Serves everything from the recorded local file; never touches the
/// network and never re-verifies.
struct MaterializedArtifact {
    entry: CacheEntry,
}

#[async_trait]
impl Downloadable for MaterializedArtifact {
    fn name(&self) -> &str {
        &self.entry.name
    }

    fn version(&self) -> &Version {
        &self.entry.version
    }

    fn content_hash(&self) -> &str {
        &self.entry.content_hash
    }

    async fn fetch_zip(&self) -> Result<Bytes> {
        read_local(&self.entry.local_file_path).await
    }

    async fn header(&self) -> Result<ModuleHeader> {
        local_header(&self.entry.name, &self.entry.local_file_path).await
    }

    async fn download(&self, target_dir: &Path) -> Result<PathBuf> {
        local_extract(&self.entry.name, &self.entry.local_file_path, target_dir).await
    }

    async fn download_zip(&self, target_file: &Path) -> Result<()> {
        local_copy(&self.entry.local_file_path, target_file).await
    }
}

async fn read_local(path: &Path) -> Result<Bytes> {
    Ok(Bytes::from(tokio::fs::read(path).await?))
}

async fn local_header(module: &str, path: &Path) -> Result<ModuleHeader> {
    let bytes = read_local(path).await?;
    archive::read_header(module, &bytes)
}

async fn local_extract(module: &str, path: &Path, target_dir: &Path) -> Result<PathBuf> {
    let bytes = read_local(path).await?;
    let dest = target_dir.join(module);
    archive::extract(module, &bytes, &dest)?;
    Ok(dest)
}

async fn local_copy(path: &Path, target_file: &Path) -> Result<()> {
    if let Some(parent) = target_file.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(path, target_file).await?;
    Ok(())
}
