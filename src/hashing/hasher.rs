//! Streaming file digests.
//!
//! Files are read through a fixed buffer so memory use stays constant
//! regardless of file size.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sha2::Digest;

use super::{HashAlgorithm, HashError};

/// Default read buffer size (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Computes lowercase hex digests of files.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            shutdown_flag: None,
        }
    }

    /// Set the read buffer size (at least one byte).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Abort hashing when this flag becomes `true`.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Digest the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an algorithm error for unsupported algorithms, a file error
    /// if the file cannot be opened or read, and [`HashError::Interrupted`]
    /// if shutdown was requested part way through.
    pub fn digest(&self, path: &Path, algorithm: &HashAlgorithm) -> Result<String, HashError> {
        algorithm.ensure_supported()?;
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let hex = self.digest_reader(file, algorithm).map_err(|e| match e {
            HashError::Io { source, .. } => HashError::from_io(path, source),
            other => other,
        })?;
        log::trace!("{} {}", algorithm, path.display());
        Ok(hex)
    }

    /// Digest everything `reader` yields.
    ///
    /// # Errors
    ///
    /// As for [`Hasher::digest`]; I/O errors carry an empty path.
    pub fn digest_reader<R: Read>(
        &self,
        reader: R,
        algorithm: &HashAlgorithm,
    ) -> Result<String, HashError> {
        match algorithm {
            HashAlgorithm::Md5 => self.stream::<md5::Md5, R>(reader),
            HashAlgorithm::Sha1 => self.stream::<sha1::Sha1, R>(reader),
            HashAlgorithm::Sha512 => self.stream::<sha2::Sha512, R>(reader),
            HashAlgorithm::Unsupported(_) => {
                algorithm.ensure_supported()?;
                Err(HashError::UnknownAlgorithm(algorithm.name().to_string()))
            }
        }
    }

    fn stream<D: Digest, R: Read>(&self, mut reader: R) -> Result<String, HashError> {
        let mut hasher = D::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            if self.is_shutdown_requested() {
                return Err(HashError::Interrupted);
            }
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(Path::new(""), e)),
            };
            hasher.update(&buffer[..n]);
        }

        Ok(hex(&hasher.finalize()))
    }
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";
    const ABC_SHA1: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";

    #[test]
    fn test_known_vectors() {
        let hasher = Hasher::new();
        assert_eq!(
            hasher
                .digest_reader(Cursor::new(b""), &HashAlgorithm::Md5)
                .unwrap(),
            EMPTY_MD5
        );
        assert_eq!(
            hasher
                .digest_reader(Cursor::new(b"abc"), &HashAlgorithm::Sha1)
                .unwrap(),
            ABC_SHA1
        );
        let sha512 = hasher
            .digest_reader(Cursor::new(b"abc"), &HashAlgorithm::Sha512)
            .unwrap();
        assert_eq!(sha512.len(), 128);
        assert!(sha512.starts_with("ddaf35a193617aba"));
    }

    #[test]
    fn test_small_buffer_gives_same_digest() {
        let data = vec![7u8; 10_000];
        let big = Hasher::new()
            .digest_reader(Cursor::new(&data), &HashAlgorithm::Sha1)
            .unwrap();
        let small = Hasher::new()
            .with_buffer_size(3)
            .digest_reader(Cursor::new(&data), &HashAlgorithm::Sha1)
            .unwrap();
        assert_eq!(big, small);
    }

    #[test]
    fn test_digest_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();

        let hex = Hasher::new().digest(&path, &HashAlgorithm::Sha1).unwrap();
        assert_eq!(hex, ABC_SHA1);
    }

    #[test]
    fn test_digest_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing");

        match Hasher::new().digest(&path, &HashAlgorithm::Md5) {
            Err(HashError::NotFound(p)) => assert_eq!(p, path),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_digest_unsupported_algorithm() {
        let result =
            Hasher::new().digest_reader(Cursor::new(b"x"), &HashAlgorithm::parse("crc32"));
        assert!(matches!(result, Err(HashError::UnknownAlgorithm(_))));
    }

    #[test]
    fn test_digest_interrupted() {
        let flag = Arc::new(AtomicBool::new(true));
        let result = Hasher::new()
            .with_shutdown_flag(flag)
            .digest_reader(Cursor::new(b"abc"), &HashAlgorithm::Md5);
        assert!(matches!(result, Err(HashError::Interrupted)));
    }
}
