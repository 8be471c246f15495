//! Integrity verification for module archives.
//!
//! Repositories declare the hash of each archive as hex-encoded SHA-512.
//! Anything that materializes remote bytes runs them through
//! [`verify_declared`] before touching disk.

use sha2::{Digest, Sha512};

use crate::error::{QuarryError, Result};

/// Compute the hex-encoded SHA-512 hash of the given bytes.
pub fn sha512_hex(data: &[u8]) -> String {
    hex::encode(Sha512::digest(data))
}

/// Check bytes against a declared hex-encoded SHA-512 hash.
pub fn matches(data: &[u8], declared: &str) -> bool {
    sha512_hex(data).eq_ignore_ascii_case(declared)
}

/// Verify fetched archive bytes against the hash the repository declared.
///
/// A mismatch is surfaced as [`QuarryError::IntegrityMismatch`] so that
/// mirror-fallback logic treats it exactly like a failed fetch.
pub fn verify_declared(module: &str, declared: &str, data: &[u8]) -> Result<()> {
    let actual = sha512_hex(data);
    if actual.eq_ignore_ascii_case(declared) {
        Ok(())
    } else {
        Err(QuarryError::IntegrityMismatch {
            module: module.to_string(),
            expected: declared.to_string(),
            actual,
        })
    }
}
