//! Incrementally materialized view over one file's bytes.
//!
//! # Overview
//!
//! A [`LazyByteSource`] reads a file forward in fixed-size chunks, only as far
//! as a caller asks for, and keeps everything it has read. Comparing two
//! files therefore costs no more I/O than the prefix needed to tell them
//! apart, and comparing one file against several others never reads the
//! same byte twice.
//!
//! ```text
//! Unopened --ensure/open--> Open --close--> Closed
//!     \________________close_______________/
//! ```
//!
//! `Closed` is terminal. Cached bytes stay readable after close, but any
//! request for bytes beyond the cache fails with [`ContentError::Closed`].

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use super::fs::FileSystem;

/// Default chunk size for incremental reads.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Errors raised while materializing file content.
#[derive(thiserror::Error, Debug)]
pub enum ContentError {
    /// The file could not be opened.
    #[error("cannot open {path}: {source}")]
    Open {
        /// File that failed to open
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A chunk read failed.
    #[error("read failed for {path} at offset {offset}: {source}")]
    Read {
        /// File that failed to read
        path: PathBuf,
        /// Offset of the failed read
        offset: u64,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The file ended before its recorded length.
    #[error("{path} ended after {actual} bytes, expected {expected}")]
    Truncated {
        /// File that was cut short
        path: PathBuf,
        /// Length recorded when the file was grouped
        expected: u64,
        /// Bytes actually available
        actual: u64,
    },

    /// More bytes were requested after the source was closed.
    #[error("{0} is closed")]
    Closed(PathBuf),
}

impl ContentError {
    /// The file this error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Open { path, .. } | Self::Read { path, .. } | Self::Truncated { path, .. } => {
                path
            }
            Self::Closed(path) => path,
        }
    }
}

/// Lifecycle state of a [`LazyByteSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// No handle acquired yet.
    Unopened,
    /// A handle is held.
    Open,
    /// The handle was released; only cached bytes remain.
    Closed,
}

enum Handle<H> {
    Unopened,
    Open(H),
    Closed,
}

/// Growing byte cache over a single file.
pub struct LazyByteSource<'fs, F: FileSystem> {
    fs: &'fs F,
    path: PathBuf,
    size: u64,
    chunk_size: usize,
    handle: Handle<F::Handle>,
    data: Vec<u8>,
}

impl<'fs, F: FileSystem> LazyByteSource<'fs, F> {
    /// Create an unopened source for `path`, whose length is already known.
    ///
    /// A `chunk_size` of zero is treated as one byte.
    #[must_use]
    pub fn new(fs: &'fs F, path: impl Into<PathBuf>, size: u64, chunk_size: usize) -> Self {
        Self {
            fs,
            path: path.into(),
            size,
            chunk_size: chunk_size.max(1),
            handle: Handle::Unopened,
            data: Vec::new(),
        }
    }

    /// File this source reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Length of the file in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Chunk size used for reads.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of bytes cached so far.
    #[must_use]
    pub fn loaded(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether the whole file is cached.
    #[must_use]
    pub fn is_fully_loaded(&self) -> bool {
        self.loaded() >= self.size
    }

    /// Cached bytes, `data[0..loaded)`.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SourceState {
        match self.handle {
            Handle::Unopened => SourceState::Unopened,
            Handle::Open(_) => SourceState::Open,
            Handle::Closed => SourceState::Closed,
        }
    }

    /// Acquire a read handle if one is not already held.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Open`] if the file cannot be opened and
    /// [`ContentError::Closed`] if the source was already closed.
    pub fn open(&mut self) -> Result<(), ContentError> {
        acquire(self.fs, &self.path, &mut self.handle).map(|_| ())
    }

    /// Make sure at least `min(n, size)` bytes are cached.
    ///
    /// Reads forward from the cached boundary in whole chunks, opening the
    /// file on first use.
    ///
    /// # Errors
    ///
    /// Returns a [`ContentError`] if the file cannot be opened or read, ends
    /// early, or the source is closed. Bytes cached before the failure stay
    /// valid.
    pub fn ensure(&mut self, n: u64) -> Result<(), ContentError> {
        let target = n.min(self.size);
        while self.loaded() < target {
            self.read_chunk()?;
        }
        Ok(())
    }

    /// Release the handle. Cached bytes remain readable.
    pub fn close(&mut self) {
        if let Handle::Open(_) = self.handle {
            log::trace!(
                "Closing {} after {} of {} bytes",
                self.path.display(),
                self.loaded(),
                self.size
            );
        }
        self.handle = Handle::Closed;
    }

    fn read_chunk(&mut self) -> Result<(), ContentError> {
        let offset = self.loaded();
        let want = (self.size - offset).min(self.chunk_size as u64) as usize;
        let handle = acquire(self.fs, &self.path, &mut self.handle)?;

        let start = self.data.len();
        self.data.resize(start + want, 0);
        let mut filled = 0;

        while filled < want {
            match handle.read(&mut self.data[start + filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    // Keep what was consumed so the cache matches the handle position.
                    self.data.truncate(start + filled);
                    return Err(ContentError::Read {
                        path: self.path.clone(),
                        offset: offset + filled as u64,
                        source,
                    });
                }
            }
        }

        self.data.truncate(start + filled);
        if filled < want {
            return Err(ContentError::Truncated {
                path: self.path.clone(),
                expected: self.size,
                actual: self.loaded(),
            });
        }
        Ok(())
    }
}

impl<F: FileSystem> std::fmt::Debug for LazyByteSource<'_, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyByteSource")
            .field("path", &self.path)
            .field("size", &self.size)
            .field("loaded", &self.loaded())
            .field("state", &self.state())
            .finish()
    }
}

fn acquire<'h, F: FileSystem>(
    fs: &F,
    path: &Path,
    handle: &'h mut Handle<F::Handle>,
) -> Result<&'h mut F::Handle, ContentError> {
    if let Handle::Unopened = handle {
        let opened = fs.open(path).map_err(|source| ContentError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        *handle = Handle::Open(opened);
    }
    match handle {
        Handle::Open(h) => Ok(h),
        _ => Err(ContentError::Closed(path.to_path_buf())),
    }
}
