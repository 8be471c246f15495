//! Fault-tolerant artifact spanning several agreeing mirrors.

use async_trait::async_trait;
use bytes::Bytes;
use semver::Version;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{QuarryError, Result};
use crate::header::ModuleHeader;
use crate::source::{Downloadable, SharedDownloadable};

/// Several mirror offers known to agree on `(name, version, content hash)`,
/// presented as a single artifact.
///
/// Materializing operations try each original in order and return the first
/// success; a failure on one mirror is logged and the next is tried. Only
/// when every mirror has failed does the operation fail, with an aggregate
/// error naming the module.
///
/// Equality and hashing are defined over the exact ordered list of original
/// handles, so two combined artifacts are equal only if built from the same
/// mirror set in the same order.
pub struct CombinedDownloadable {
    name: String,
    version: Version,
    content_hash: String,
    originals: Vec<SharedDownloadable>,
}

impl CombinedDownloadable {
    /// Build a combined artifact from a non-empty group of agreeing offers.
    ///
    /// Fails with [`QuarryError::GroupMismatch`] if the originals disagree
    /// on name, version or declared hash. The quorum verifier only ever
    /// hands over agreeing groups, so triggering that error signals a bug
    /// in the caller.
    pub fn new(originals: Vec<SharedDownloadable>) -> Result<Self> {
        let first = originals.first().ok_or(QuarryError::EmptyGroup)?;

        let name = first.name().to_string();
        let version = first.version().clone();
        let content_hash = first.content_hash().to_string();

        for original in &originals[1..] {
            if original.name() != name
                || original.version() != &version
                || !original.content_hash().eq_ignore_ascii_case(&content_hash)
            {
                return Err(QuarryError::GroupMismatch(format!("{name}@{version}")));
            }
        }

        Ok(Self {
            name,
            version,
            content_hash,
            originals,
        })
    }

    /// Combiner for the quorum verifier.
    pub fn combine(originals: Vec<SharedDownloadable>) -> Result<SharedDownloadable> {
        Ok(Arc::new(Self::new(originals)?))
    }

    /// The mirror offers this artifact was built from, in fallback order.
    pub fn originals(&self) -> &[SharedDownloadable] {
        &self.originals
    }

    fn exhausted(&self, last: QuarryError) -> QuarryError {
        QuarryError::MirrorsExhausted {
            module: self.coordinate(),
            attempts: self.originals.len(),
            last: last.to_string(),
        }
    }
}

macro_rules! first_success {
    ($self:ident, $op:ident ( $($arg:expr),* )) => {{
        let mut last = None;
        for original in &$self.originals {
            match original.$op($($arg),*).await {
                Ok(value) => {
                    debug!("{} served {} for {}", stringify!($op), original.coordinate(),
                        $self.name);
                    return Ok(value);
                }
                Err(e) => {
                    warn!("Mirror attempt failed for {}: {}", $self.coordinate(), e);
                    last = Some(e);
                }
            }
        }
        // new() guarantees at least one original, so last is always set
        Err($self.exhausted(last.unwrap_or(QuarryError::EmptyGroup)))
    }};
}

#[async_trait]
impl Downloadable for CombinedDownloadable {
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
        first_success!(self, fetch_zip())
    }

    async fn header(&self) -> Result<ModuleHeader> {
        first_success!(self, header())
    }

    async fn download(&self, target_dir: &Path) -> Result<PathBuf> {
        first_success!(self, download(target_dir))
    }

    async fn download_zip(&self, target_file: &Path) -> Result<()> {
        first_success!(self, download_zip(target_file))
    }
}

impl PartialEq for CombinedDownloadable {
    fn eq(&self, other: &Self) -> bool {
        self.originals.len() == other.originals.len()
            && self
                .originals
                .iter()
                .zip(&other.originals)
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

impl Eq for CombinedDownloadable {}

impl Hash for CombinedDownloadable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for original in &self.originals {
            (Arc::as_ptr(original) as *const () as usize).hash(state);
        }
    }
}

impl std::fmt::Debug for CombinedDownloadable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinedDownloadable")
            .field("module", &self.coordinate())
            .field("content_hash", &self.content_hash)
            .field("mirrors", &self.originals.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity;
    use std::collections::hash_map::DefaultHasher;

    /// Mirror double: serves fixed bytes, or fails every fetch.
    struct Mirror {
        name: String,
        version: Version,
        hash: String,
        bytes: Option<Bytes>,
    }

    #[async_trait]
    impl Downloadable for Mirror {
        fn name(&self) -> &str {
            &self.name
        }
        fn version(&self) -> &Version {
            &self.version
        }
        fn content_hash(&self) -> &str {
            &self.hash
        }
        async fn fetch_zip(&self) -> Result<Bytes> {
            self.bytes
                .clone()
                .ok_or_else(|| QuarryError::Repository(format!("{} is offline", self.name)))
        }
    }

    fn working(data: &'static [u8]) -> SharedDownloadable {
        Arc::new(Mirror {
            name: "test/a".into(),
            version: Version::new(1, 0, 0),
            hash: integrity::sha512_hex(data),
            bytes: Some(Bytes::from_static(data)),
        })
    }

    fn broken(data: &'static [u8]) -> SharedDownloadable {
        Arc::new(Mirror {
            name: "test/a".into(),
            version: Version::new(1, 0, 0),
            hash: integrity::sha512_hex(data),
            bytes: None,
        })
    }

    fn fingerprint(c: &CombinedDownloadable) -> u64 {
        let mut hasher = DefaultHasher::new();
        c.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_disagreeing_group_is_rejected() {
        let err = CombinedDownloadable::new(vec![working(b"one"), working(b"two")]).unwrap_err();
        assert!(matches!(err, QuarryError::GroupMismatch(m) if m == "test/a@1.0.0"));
    }

    #[test]
    fn test_empty_group_is_rejected() {
        assert!(matches!(
            CombinedDownloadable::new(Vec::new()).unwrap_err(),
            QuarryError::EmptyGroup
        ));
    }

    #[tokio::test]
    async fn test_fallback_succeeds_in_either_order() {
        let data = b"archive bytes";
        for originals in [
            vec![broken(data), working(data)],
            vec![working(data), broken(data)],
        ] {
            let combined = CombinedDownloadable::new(originals).unwrap();
            assert_eq!(combined.fetch_zip().await.unwrap(), Bytes::from_static(data));
        }
    }

    #[tokio::test]
    async fn test_total_failure_is_aggregate() {
        let combined =
            CombinedDownloadable::new(vec![broken(b"data"), broken(b"data")]).unwrap();
        let err = combined.fetch_zip().await.unwrap_err();
        match err {
            QuarryError::MirrorsExhausted { module, attempts, .. } => {
                assert_eq!(module, "test/a@1.0.0");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_identity_over_original_set() {
        let a = working(b"data");
        let b = working(b"data");

        let left = CombinedDownloadable::new(vec![a.clone(), b.clone()]).unwrap();
        let same = CombinedDownloadable::new(vec![a.clone(), b.clone()]).unwrap();
        let reordered = CombinedDownloadable::new(vec![b.clone(), a.clone()]).unwrap();
        let subset = CombinedDownloadable::new(vec![a.clone()]).unwrap();

        assert_eq!(left, same);
        assert_eq!(fingerprint(&left), fingerprint(&same));
        assert_ne!(left, reordered);
        assert_ne!(left, subset);
    }
}
