//! Error types for quarry-resolve.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for quarry-resolve operations.
pub type Result<T> = std::result::Result<T, QuarryError>;

/// Main error type for quarry-resolve.
#[derive(Error, Debug)]
pub enum QuarryError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Semver parsing error
    #[error("Invalid version: {0}")]
    Semver(#[from] semver::Error),

    /// Archive error
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Fetched bytes do not hash to the declared value
    #[error("Integrity check failed for {module}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        module: String,
        expected: String,
        actual: String,
    },

    /// Archive has no header entry at its root
    #[error("Header entry not found in archive for {0}")]
    HeaderEntryNotFound(String),

    /// Module header bytes could not be parsed
    #[error("Invalid module header: {0}")]
    InvalidHeader(String),

    /// Every mirror in a combined artifact failed
    #[error("All {attempts} mirrors failed for {module}: {last}")]
    MirrorsExhausted {
        module: String,
        attempts: usize,
        last: String,
    },

    /// A combined artifact was built from originals that disagree
    #[error("Artifact group mismatch for {0}: originals differ in name, version or content hash")]
    GroupMismatch(String),

    /// A combined artifact was built from nothing
    #[error("Cannot combine an empty artifact group")]
    EmptyGroup,

    /// Cache index file exists but cannot be deserialized
    #[error("Malformed cache index at {}: {reason}", path.display())]
    MalformedCacheIndex { path: PathBuf, reason: String },

    /// Repository-side failure (lookup or raw fetch)
    #[error("Repository error: {0}")]
    Repository(String),

    /// General error with message
    #[error("{0}")]
    Other(String),
}

impl From<&str> for QuarryError {
    fn from(s: &str) -> Self {
        QuarryError::Other(s.to_string())
    }
}

impl From<String> for QuarryError {
    fn from(s: String) -> Self {
        QuarryError::Other(s)
    }
}
