//! Filesystem collaborator used by the collision engine.
//!
//! The engine never touches `std::fs` directly. Metadata lookups and content
//! reads go through [`FileSystem`], so the size grouping and the byte
//! comparison can be exercised against in-memory fixtures, and so the
//! grouping never depends on the process working directory.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Metadata and content provider for the files named in a manifest.
pub trait FileSystem: Send + Sync {
    /// Readable handle returned by [`FileSystem::open`].
    type Handle: Read;

    /// Length of the file in bytes.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the metadata cannot be read,
    /// e.g. the file was removed after the manifest was generated.
    fn len(&self, path: &Path) -> io::Result<u64>;

    /// Open the file for sequential reading from offset 0.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the file cannot be opened.
    fn open(&self, path: &Path) -> io::Result<Self::Handle>;
}

/// The local filesystem, with manifest filenames resolved against a base
/// directory.
#[derive(Debug, Clone, Default)]
pub struct LocalFs {
    base: Option<PathBuf>,
}

impl LocalFs {
    /// Resolve filenames relative to the current directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve filenames relative to `base`.
    #[must_use]
    pub fn rooted(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    /// Full path for a manifest filename.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match self.base {
            Some(ref base) => base.join(path),
            None => path.to_path_buf(),
        }
    }
}

impl FileSystem for LocalFs {
    type Handle = File;

    fn len(&self, path: &Path) -> io::Result<u64> {
        // Manifests describe the entries themselves, so symlinks are not followed.
        std::fs::symlink_metadata(self.resolve(path)).map(|m| m.len())
    }

    fn open(&self, path: &Path) -> io::Result<File> {
        File::open(self.resolve(path))
    }
}
