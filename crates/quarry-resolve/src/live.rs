//! The no-cache repository: quorum verification with no persistence.
//!
//! Runs the verifier against the live sources on every call. Useful on its
//! own where local state is unwanted, and as the reference behavior the
//! cached variant is checked against.

use async_trait::async_trait;
use semver::VersionReq;

use crate::combined::CombinedDownloadable;
use crate::error::Result;
use crate::quorum;
use crate::source::{CachingRepository, Repository, SharedDownloadable, SharedRepository};

/// A [`CachingRepository`] that never materializes anything.
pub struct NoCacheRepository {
    name: String,
    sources: Vec<SharedRepository>,
}

impl NoCacheRepository {
    /// Create a no-cache repository over the given live sources. Sources
    /// that are themselves caching repositories are skipped during
    /// verification.
    pub fn new(name: impl Into<String>, sources: Vec<SharedRepository>) -> Self {
        Self {
            name: name.into(),
            sources,
        }
    }
}

#[async_trait]
impl Repository for NoCacheRepository {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(
        &self,
        module: &str,
        constraint: &VersionReq,
    ) -> Result<Vec<SharedDownloadable>> {
        quorum::find_verified(&self.sources, module, constraint, CombinedDownloadable::combine)
            .await
    }

    async fn find_all(&self) -> Result<Vec<SharedDownloadable>> {
        quorum::find_all_verified(&self.sources, CombinedDownloadable::combine).await
    }

    fn is_caching(&self) -> bool {
        true
    }
}

#[async_trait]
impl CachingRepository for NoCacheRepository {
    async fn find_all_cached(&self) -> Result<Vec<SharedDownloadable>> {
        Ok(Vec::new())
    }
}
