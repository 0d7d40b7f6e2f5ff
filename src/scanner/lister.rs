//! Directory listing.

use std::fs;
use std::path::Path;

use super::ScanError;
use crate::manifest::SEPARATOR;

/// Check whether a file name belongs in a manifest.
///
/// Hidden names and manifest names (`*SUMS`) are excluded.
#[must_use]
pub fn is_listable(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.ends_with("SUMS")
}

/// Check whether a file name survives a manifest round trip.
///
/// A name holding the two-space separator or a line break would be split
/// differently when read back.
#[must_use]
pub fn is_representable(name: &str) -> bool {
    !name.contains(SEPARATOR) && !name.contains(['\n', '\r'])
}

/// List the regular files directly inside `dir`, sorted by name.
///
/// Symlinks, directories and special files are skipped, as are names that
/// fail [`is_listable`] or [`is_representable`] or are not valid UTF-8.
///
/// # Errors
///
/// Returns [`ScanError::NotFound`] or [`ScanError::NotADirectory`] when
/// `dir` is unusable, and [`ScanError::Io`] if an entry cannot be read.
pub fn list_files(dir: &Path) -> Result<Vec<String>, ScanError> {
    let meta = fs::metadata(dir).map_err(|e| ScanError::from_io(dir.to_path_buf(), e))?;
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|e| ScanError::from_io(dir.to_path_buf(), e))?;
    let mut names = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| ScanError::from_io(dir.to_path_buf(), e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| ScanError::from_io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }

        let Ok(name) = entry.file_name().into_string() else {
            log::warn!("Skipping non UTF-8 file name: {}", entry.path().display());
            continue;
        };
        if !is_listable(&name) {
            log::trace!("Skipping {}", name);
        } else if !is_representable(&name) {
            log::warn!("Skipping {:?}: name cannot be stored in a manifest", name);
        } else {
            names.push(name);
        }
    }

    names.sort();
    log::debug!("Listed {} file(s) in {}", names.len(), dir.display());
    Ok(names)
}
