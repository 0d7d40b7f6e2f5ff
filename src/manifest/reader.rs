//! Manifest parsing.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use super::{ManifestRecord, ParseMode};
use crate::hashing::HashError;

/// A line that is not a `<checksum>  <filename>` record.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: missing separator in {content:?}")]
pub struct ManifestParseError {
    /// 1-based line number
    pub line: usize,
    /// The offending line, lossily decoded
    pub content: String,
}

/// Errors that prevent a manifest from being loaded.
#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    /// No manifest file was found.
    #[error("No known checksum file found: {0}")]
    NotFound(PathBuf),

    /// The manifest could not be read.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Manifest path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A malformed line in strict mode.
    #[error(transparent)]
    Parse(#[from] ManifestParseError),

    /// The manifest's algorithm cannot be used.
    #[error(transparent)]
    UnknownAlgorithm(#[from] HashError),
}

/// Parsed manifest content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Records in file order
    pub records: Vec<ManifestRecord>,
    /// Malformed lines skipped in lenient mode
    pub skipped: Vec<ManifestParseError>,
}

impl Manifest {
    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse manifest text from `reader`.
///
/// Blank lines are ignored in both modes. A trailing `\r` is stripped so
/// manifests written on Windows parse the same way. A line without the
/// separator, or one that is not valid UTF-8, is skipped in
/// [`ParseMode::Lenient`] and aborts the load in [`ParseMode::Strict`].
///
/// # Errors
///
/// Returns [`ManifestError::Parse`] for the first malformed line in strict
/// mode and [`ManifestError::Io`] if reading fails.
pub fn read_manifest<R: BufRead>(mut reader: R, mode: ParseMode) -> Result<Manifest, ManifestError> {
    let mut manifest = Manifest::default();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| ManifestError::Io {
                path: PathBuf::new(),
                source,
            })?;
        if n == 0 {
            break;
        }
        line_no += 1;

        let mut raw = buf.as_slice();
        if let Some(stripped) = raw.strip_suffix(b"\n") {
            raw = stripped;
        }
        if let Some(stripped) = raw.strip_suffix(b"\r") {
            raw = stripped;
        }
        if raw.is_empty() {
            continue;
        }

        let record = std::str::from_utf8(raw)
            .ok()
            .and_then(ManifestRecord::parse_line);

        match record {
            Some(record) => manifest.records.push(record),
            None => {
                let err = ManifestParseError {
                    line: line_no,
                    content: String::from_utf8_lossy(raw).into_owned(),
                };
                match mode {
                    ParseMode::Strict => return Err(err.into()),
                    ParseMode::Lenient => {
                        log::warn!("Skipping malformed manifest {}", err);
                        manifest.skipped.push(err);
                    }
                }
            }
        }
    }

    log::debug!(
        "Parsed {} record(s), skipped {} line(s)",
        manifest.records.len(),
        manifest.skipped.len()
    );
    Ok(manifest)
}

/// Open and parse the manifest at `path`.
///
/// # Errors
///
/// Returns [`ManifestError::Io`] (with the path) if the file cannot be
/// opened or read, and parse errors as for [`read_manifest`].
pub fn load_manifest(path: &Path, mode: ParseMode) -> Result<Manifest, ManifestError> {
    let file = File::open(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_manifest(BufReader::new(file), mode).map_err(|err| match err {
        ManifestError::Io { source, .. } => ManifestError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}
