//! Flat directory listing.
//!
//! Only the immediate entries of one directory are considered. Manifest
//! files (`*SUMS`) and hidden files are never listed, so a manifest never
//! contains itself.
//!
//! # Example
//!
//! ```no_run
//! use rustsums::scanner::list_files;
//! use std::path::Path;
//!
//! for name in list_files(Path::new(".")).unwrap() {
//!     println!("{name}");
//! }
//! ```

pub mod lister;

use std::path::PathBuf;

pub use lister::{is_listable, is_representable, list_files};

/// Errors that can occur while listing a directory.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when reading the directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while reading an entry.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    pub(crate) fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io { path, source },
        }
    }
}
