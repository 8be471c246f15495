//! Source contracts: the `Downloadable` and `Repository` capability traits.
//!
//! Every other component of this crate is generic over these two traits.
//! Concrete mirror transports live outside this crate; they only have to
//! produce trait objects that can enumerate artifacts and fetch raw bytes.

use async_trait::async_trait;
use bytes::Bytes;
use semver::{Version, VersionReq};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::archive;
use crate::error::Result;
use crate::header::ModuleHeader;
use crate::integrity;

/// Shared handle to an artifact.
pub type SharedDownloadable = Arc<dyn Downloadable>;

/// Shared handle to a repository.
pub type SharedRepository = Arc<dyn Repository>;

/// One concrete offer of a module version from one source.
///
/// The declared content hash is whatever the offering source claims; it is
/// only verified when bytes are actually fetched. Implementors provide
/// identity plus [`fetch_zip`](Downloadable::fetch_zip); the materializing
/// operations have default implementations on top of the raw fetch, each of
/// which verifies the declared hash before using the bytes.
#[async_trait]
pub trait Downloadable: Send + Sync {
    /// Namespaced module name, e.g. `org/module`.
    fn name(&self) -> &str;

    /// Fully-qualified version of this offer.
    fn version(&self) -> &Version;

    /// Hex-encoded SHA-512 of the archive bytes, as declared by the source.
    fn content_hash(&self) -> &str;

    /// Fetch the raw archive bytes from the source. Unverified.
    async fn fetch_zip(&self) -> Result<Bytes>;

    /// Fetch and verify the archive, then parse just the module header from
    /// it without extracting the rest.
    async fn header(&self) -> Result<ModuleHeader> {
        let bytes = self.fetch_zip().await?;
        integrity::verify_declared(&self.coordinate(), self.content_hash(), &bytes)?;
        archive::read_header(self.name(), &bytes)
    }

    /// Fetch, verify and extract the archive under `target_dir/<name>`.
    /// Returns the extraction directory.
    async fn download(&self, target_dir: &Path) -> Result<PathBuf> {
        let bytes = self.fetch_zip().await?;
        integrity::verify_declared(&self.coordinate(), self.content_hash(), &bytes)?;
        let dest = target_dir.join(self.name());
        archive::extract(self.name(), &bytes, &dest)?;
        Ok(dest)
    }

    /// Fetch and verify the archive, writing the raw bytes verbatim to
    /// `target_file`. Parent directories are created on demand.
    async fn download_zip(&self, target_file: &Path) -> Result<()> {
        let bytes = self.fetch_zip().await?;
        integrity::verify_declared(&self.coordinate(), self.content_hash(), &bytes)?;
        if let Some(parent) = target_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(target_file, &bytes).await?;
        Ok(())
    }

    /// `name@version`, for log and error messages.
    fn coordinate(&self) -> String {
        format!("{}@{}", self.name(), self.version())
    }
}

/// A named source of artifacts.
///
/// A repository may legitimately return zero, one or many offers for the
/// same `(name, version)` with different content hashes; the quorum
/// verifier exists to reconcile exactly that.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Human-readable source name, for logs.
    fn name(&self) -> &str;

    /// Offers matching `module` whose version satisfies `constraint`.
    async fn find(&self, module: &str, constraint: &VersionReq)
    -> Result<Vec<SharedDownloadable>>;

    /// Every offer this source knows about, any name or version.
    async fn find_all(&self) -> Result<Vec<SharedDownloadable>>;

    /// Reports whether this repository is itself a caching layer. Caching
    /// repositories are skipped as quorum sources so that verification
    /// never recurses through a cache.
    fn is_caching(&self) -> bool {
        false
    }
}

/// A repository that also tracks artifacts already materialized locally.
#[async_trait]
pub trait CachingRepository: Repository {
    /// Artifacts already materialized to local storage. No network access.
    async fn find_all_cached(&self) -> Result<Vec<SharedDownloadable>>;
}
