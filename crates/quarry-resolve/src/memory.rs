//! In-memory repository.
//!
//! A [`Repository`] backed by an index-record list and a blob map. This is
//! the reference implementation of the source contracts and the fixture
//! this crate's own tests resolve against; embedders can use it the same
//! way. It is not a transport.

use async_trait::async_trait;
use bytes::Bytes;
use semver::{Version, VersionReq};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{QuarryError, Result};
use crate::index::IndexRecord;
use crate::source::{Downloadable, Repository, SharedDownloadable};

/// A repository whose index and archive bytes live in memory.
pub struct MemoryRepository {
    name: String,
    records: Vec<IndexRecord>,
    blobs: HashMap<String, Bytes>,
}

impl MemoryRepository {
    /// Create an empty in-memory repository.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Vec::new(),
            blobs: HashMap::new(),
        }
    }

    /// Offer an artifact: one index record plus the bytes its archive
    /// locator resolves to.
    pub fn insert(&mut self, record: IndexRecord, archive: impl Into<Bytes>) -> &mut Self {
        self.blobs.insert(record.archive_locator.clone(), archive.into());
        self.records.push(record);
        self
    }

    /// Offer an index record without backing bytes. Lookups will still
    /// return it; any fetch through it fails, like a mirror that serves
    /// its index but drops archive requests.
    pub fn insert_unfetchable(&mut self, record: IndexRecord) -> &mut Self {
        self.records.push(record);
        self
    }

    fn artifact(&self, record: &IndexRecord) -> SharedDownloadable {
        Arc::new(MemoryArtifact {
            source: self.name.clone(),
            record: record.clone(),
            archive: self.blobs.get(&record.archive_locator).cloned(),
        })
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(
        &self,
        module: &str,
        constraint: &VersionReq,
    ) -> Result<Vec<SharedDownloadable>> {
        Ok(self
            .records
            .iter()
            .filter(|record| record.satisfies(module, constraint))
            .map(|record| self.artifact(record))
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<SharedDownloadable>> {
        Ok(self.records.iter().map(|record| self.artifact(record)).collect())
    }
}

struct MemoryArtifact {
    source: String,
    record: IndexRecord,
    archive: Option<Bytes>,
}

#[async_trait]
impl Downloadable for MemoryArtifact {
    fn name(&self) -> &str {
        &self.record.name
    }

    fn version(&self) -> &Version {
        &self.record.version
    }

    fn content_hash(&self) -> &str {
        &self.record.content_hash
    }

    async fn fetch_zip(&self) -> Result<Bytes> {
        self.archive.clone().ok_or_else(|| {
            QuarryError::Repository(format!(
                "{} has no bytes for {}",
                self.source, self.record.archive_locator
            ))
        })
    }
}
