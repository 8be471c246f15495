//! quarry-resolve - mirror resolution, quorum verification and local
//! caching for the Quarry module manager.
//!
//! A module may be mirrored on several independent, partially-untrusted
//! repositories that can disagree, go offline, or serve corrupted data.
//! This crate locates a trustworthy, byte-identical artifact anyway:
//!
//! - [`source`] defines the capability traits everything else is generic
//!   over: a [`Repository`](source::Repository) enumerates artifacts, a
//!   [`Downloadable`](source::Downloadable) fetches and materializes one.
//! - [`quorum`] reconciles divergent answers by grouping offers by declared
//!   content hash and trusting the hash most mirrors agree on.
//! - [`combined`] presents a winning group as one fault-tolerant artifact
//!   that falls back across its mirrors.
//! - [`live`] resolves against the live sources with no persistence.
//! - [`cache`] adds the disk-backed materialization cache with its JSON
//!   sidecar index, so an artifact fetched once is never fetched again.
//! - [`blocking`] is a thin synchronous façade over the async core.
//!
//! Resolution and materialization are decoupled: `find` performs no archive
//! traffic, and bytes only move when `header`, `download` or `download_zip`
//! is invoked on a returned handle.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use quarry_resolve::cache::LocalCacheRepository;
//! use quarry_resolve::config::CacheConfig;
//! use quarry_resolve::source::{Repository, SharedRepository};
//!
//! # async fn example(mirrors: Vec<SharedRepository>) -> quarry_resolve::error::Result<()> {
//! let repo = LocalCacheRepository::new("local", mirrors, CacheConfig::default())?;
//!
//! for artifact in repo.find("org/module", &"^1.0".parse().unwrap()).await? {
//!     let header = artifact.header().await?;
//!     println!("{} {}", header.name, header.version);
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod blocking;
pub mod cache;
pub mod combined;
pub mod config;
pub mod error;
pub mod header;
pub mod index;
pub mod integrity;
pub mod live;
pub mod memory;
pub mod quorum;
pub mod source;

pub use blocking::{BlockingCachingRepository, BlockingDownloadable, BlockingRepository};
pub use cache::{CacheEntry, LocalCacheRepository};
pub use combined::CombinedDownloadable;
pub use config::CacheConfig;
pub use error::{QuarryError, Result};
pub use header::ModuleHeader;
pub use index::IndexRecord;
pub use live::NoCacheRepository;
pub use memory::MemoryRepository;
pub use source::{
    CachingRepository, Downloadable, Repository, SharedDownloadable, SharedRepository,
};
