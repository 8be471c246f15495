//! Blocking façade over the async core.
//!
//! Thin adapters that park the calling thread on the underlying async task;
//! no logic is duplicated. Not for use from inside an async context; call
//! the async methods there instead.

use semver::VersionReq;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use bytes::Bytes;

use crate::error::Result;
use crate::header::ModuleHeader;
use crate::source::{CachingRepository, Downloadable, Repository, SharedDownloadable};

fn runtime() -> &'static tokio::runtime::Runtime {
    static RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
    RT.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("failed to build tokio runtime for quarry blocking facade")
    })
}

/// Blocking equivalents of the [`Downloadable`] operations.
pub trait BlockingDownloadable {
    fn header_blocking(&self) -> Result<ModuleHeader>;
    fn download_blocking(&self, target_dir: &Path) -> Result<PathBuf>;
    fn download_zip_blocking(&self, target_file: &Path) -> Result<()>;
    fn fetch_zip_blocking(&self) -> Result<Bytes>;
}

impl<T: Downloadable + ?Sized> BlockingDownloadable for T {
    fn header_blocking(&self) -> Result<ModuleHeader> {
        runtime().block_on(self.header())
    }

    fn download_blocking(&self, target_dir: &Path) -> Result<PathBuf> {
        runtime().block_on(self.download(target_dir))
    }

    fn download_zip_blocking(&self, target_file: &Path) -> Result<()> {
        runtime().block_on(self.download_zip(target_file))
    }

    fn fetch_zip_blocking(&self) -> Result<Bytes> {
        runtime().block_on(self.fetch_zip())
    }
}

/// Blocking equivalents of the [`Repository`] operations.
pub trait BlockingRepository {
    fn find_blocking(
        &self,
        module: &str,
        constraint: &VersionReq,
    ) -> Result<Vec<SharedDownloadable>>;
    fn find_all_blocking(&self) -> Result<Vec<SharedDownloadable>>;
}

impl<T: Repository + ?Sized> BlockingRepository for T {
    fn find_blocking(
        &self,
        module: &str,
        constraint: &VersionReq,
    ) -> Result<Vec<SharedDownloadable>> {
        runtime().block_on(self.find(module, constraint))
    }

    fn find_all_blocking(&self) -> Result<Vec<SharedDownloadable>> {
        runtime().block_on(self.find_all())
    }
}

/// Blocking equivalent of [`CachingRepository::find_all_cached`].
pub trait BlockingCachingRepository {
    fn find_all_cached_blocking(&self) -> Result<Vec<SharedDownloadable>>;
}

impl<T: CachingRepository + ?Sized> BlockingCachingRepository for T {
    fn find_all_cached_blocking(&self) -> Result<Vec<SharedDownloadable>> {
        runtime().block_on(self.find_all_cached())
    }
}
