//! Checksum manifest model and text I/O.
//!
//! A manifest is a text file with one record per line:
//!
//! ```text
//! <lowercase hex checksum><two spaces><filename>\n
//! ```
//!
//! Filenames are not escaped; names containing the separator or a newline
//! cannot be represented.
//!
//! # Example
//!
//! ```
//! use rustsums::manifest::ManifestRecord;
//!
//! let record = ManifestRecord::parse_line("d41d8cd98f00b204e9800998ecf8427e  empty.txt").unwrap();
//! assert_eq!(record.checksum, "d41d8cd98f00b204e9800998ecf8427e");
//! assert_eq!(record.filename, "empty.txt");
//! assert_eq!(record.to_line(), "d41d8cd98f00b204e9800998ecf8427e  empty.txt");
//! ```

pub mod reader;
pub mod writer;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::hashing::HashAlgorithm;

pub use reader::{load_manifest, read_manifest, Manifest, ManifestError, ManifestParseError};
pub use writer::{save_manifest, write_manifest, ManifestWriter};

/// Separator between checksum and filename.
pub const SEPARATOR: &str = "  ";

/// One `(checksum, filename)` line of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// Lowercase hex digest
    pub checksum: String,
    /// Filename relative to the manifest's directory
    pub filename: String,
}

impl ManifestRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(checksum: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            checksum: checksum.into(),
            filename: filename.into(),
        }
    }

    /// Parse one line (without its newline).
    ///
    /// Splits at the first occurrence of [`SEPARATOR`]. Returns `None` when
    /// the line has no separator.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        line.split_once(SEPARATOR)
            .map(|(checksum, filename)| Self::new(checksum, filename))
    }

    /// Render this record as a manifest line (without newline).
    #[must_use]
    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ManifestRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.checksum, SEPARATOR, self.filename)
    }
}

/// What to do with a line that is not a valid record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Skip the line and log a warning.
    #[default]
    Lenient,
    /// Abort loading the manifest.
    Strict,
}

/// Find the manifest in `dir`.
///
/// With an explicit algorithm, its `<NAME>SUMS` file must exist. Without
/// one, the preferred algorithms are tried in order and the first manifest
/// found wins.
///
/// # Errors
///
/// Returns [`ManifestError::UnknownAlgorithm`] for an unsupported algorithm
/// and [`ManifestError::NotFound`] when no manifest exists.
pub fn locate_manifest(
    dir: &Path,
    algorithm: Option<&HashAlgorithm>,
) -> Result<(HashAlgorithm, PathBuf), ManifestError> {
    if let Some(algorithm) = algorithm {
        let path = dir.join(algorithm.manifest_filename()?);
        if path.is_file() {
            return Ok((algorithm.clone(), path));
        }
        return Err(ManifestError::NotFound(path));
    }

    for candidate in HashAlgorithm::preferred_order() {
        let path = dir.join(candidate.manifest_filename()?);
        if path.is_file() {
            log::debug!("Using manifest {}", path.display());
            return Ok((candidate, path));
        }
    }
    Err(ManifestError::NotFound(dir.to_path_buf()))
}
