//! Digest computation.
//!
//! [`HashAlgorithm`] is the single table mapping algorithm names to
//! implementations; [`Hasher`] streams files through the RustCrypto digests.

pub mod algorithm;
pub mod hasher;

use std::io;
use std::path::{Path, PathBuf};

pub use algorithm::HashAlgorithm;
pub use hasher::{Hasher, DEFAULT_BUFFER_SIZE};

/// Errors from algorithm selection and hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The name is not a known hash function.
    #[error("{0} is not a known hash function")]
    UnknownAlgorithm(String),

    /// A recognised algorithm this build does not provide.
    #[error("{0} is not supported or not linked into the binary")]
    Unavailable(String),

    /// File not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Any other I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// File being hashed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Shutdown was requested while hashing.
    #[error("Hashing interrupted")]
    Interrupted,
}

impl HashError {
    /// Classify an I/O error for `path`.
    pub(crate) fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// Check whether this error is about the algorithm rather than a file.
    #[must_use]
    pub fn is_algorithm_error(&self) -> bool {
        matches!(self, Self::UnknownAlgorithm(_) | Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            HashError::UnknownAlgorithm("CRC32".into()).to_string(),
            "CRC32 is not a known hash function"
        );
        assert_eq!(
            HashError::Unavailable("SHA256".into()).to_string(),
            "SHA256 is not supported or not linked into the binary"
        );
    }

    #[test]
    fn test_from_io_classification() {
        let path = Path::new("x");
        assert!(matches!(
            HashError::from_io(path, io::Error::from(io::ErrorKind::NotFound)),
            HashError::NotFound(_)
        ));
        assert!(matches!(
            HashError::from_io(path, io::Error::from(io::ErrorKind::PermissionDenied)),
            HashError::PermissionDenied(_)
        ));
        assert!(matches!(
            HashError::from_io(path, io::Error::other("boom")),
            HashError::Io { .. }
        ));
    }

    #[test]
    fn test_is_algorithm_error() {
        assert!(HashError::UnknownAlgorithm("X".into()).is_algorithm_error());
        assert!(!HashError::Interrupted.is_algorithm_error());
    }
}
