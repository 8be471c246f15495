//! Module archive handling.
//!
//! Archives are plain zip files with the module header stored at a fixed
//! entry name in the root. The header can be read without extracting the
//! rest of the archive.

use std::io::{Cursor, Read};
use std::path::Path;

use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{QuarryError, Result};
use crate::header::ModuleHeader;

/// Fixed name of the header entry at the archive root.
pub const HEADER_ENTRY: &str = "quarry.json";

/// Read and parse the header entry from archive bytes without extracting
/// anything else.
pub fn read_header(module: &str, bytes: &[u8]) -> Result<ModuleHeader> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut entry = match archive.by_name(HEADER_ENTRY) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(QuarryError::HeaderEntryNotFound(module.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut buf)?;

    ModuleHeader::from_bytes(&buf)
}

/// Extract archive bytes under `dest`, creating directories as needed.
///
/// Entries that would escape `dest` are rejected.
pub fn extract(module: &str, bytes: &[u8], dest: &Path) -> Result<()> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    std::fs::create_dir_all(dest)?;
    debug!("Extracting {} entries for {} to {}", archive.len(), module, dest.display());

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(QuarryError::Repository(format!(
                "Archive for {} contains an unsafe path: {}",
                module,
                entry.name()
            )));
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out = std::fs::File::create(&target)?;
        std::io::copy(&mut entry, &mut out)?;
    }

    Ok(())
}
