//! In-memory filesystem for unit tests of the collision engine.

use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use super::fs::FileSystem;

#[derive(Debug, Clone)]
enum Fixture {
    Content(Vec<u8>),
    /// Metadata reports `len`, but open fails.
    Unopenable(u64),
    /// Metadata reports the full length, reads fail after `fail_after` bytes.
    Flaky { data: Vec<u8>, fail_after: usize },
}

/// Filesystem fixture counting opens and bytes served.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: HashMap<PathBuf, Fixture>,
    bytes_read: Arc<AtomicU64>,
    opens: Arc<AtomicUsize>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.files
            .insert(PathBuf::from(name), Fixture::Content(data.into()));
        self
    }

    pub fn with_unopenable(mut self, name: &str, len: u64) -> Self {
        self.files
            .insert(PathBuf::from(name), Fixture::Unopenable(len));
        self
    }

    pub fn with_flaky(mut self, name: &str, data: impl Into<Vec<u8>>, fail_after: usize) -> Self {
        self.files.insert(
            PathBuf::from(name),
            Fixture::Flaky {
                data: data.into(),
                fail_after,
            },
        );
        self
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

pub struct MemoryHandle {
    data: Vec<u8>,
    pos: usize,
    fail_after: Option<usize>,
    counter: Arc<AtomicU64>,
}

impl Read for MemoryHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = match self.fail_after {
            Some(limit) if self.pos >= limit => {
                return Err(io::Error::new(io::ErrorKind::Other, "injected read failure"));
            }
            Some(limit) => limit,
            None => self.data.len(),
        };
        let end = limit.min(self.data.len()).min(self.pos + buf.len());
        let n = end - self.pos;
        buf[..n].copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        self.counter.fetch_add(n as u64, Ordering::SeqCst);
        Ok(n)
    }
}

impl FileSystem for MemoryFs {
    type Handle = MemoryHandle;

    fn len(&self, path: &Path) -> io::Result<u64> {
        match self.files.get(path) {
            Some(Fixture::Content(data)) | Some(Fixture::Flaky { data, .. }) => {
                Ok(data.len() as u64)
            }
            Some(Fixture::Unopenable(len)) => Ok(*len),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no such file")),
        }
    }

    fn open(&self, path: &Path) -> io::Result<MemoryHandle> {
        let (data, fail_after) = match self.files.get(path) {
            Some(Fixture::Content(data)) => (data.clone(), None),
            Some(Fixture::Flaky { data, fail_after }) => (data.clone(), Some(*fail_after)),
            Some(Fixture::Unopenable(_)) => {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "permission denied",
                ))
            }
            None => return Err(io::Error::new(io::ErrorKind::NotFound, "no such file")),
        };
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryHandle {
            data,
            pos: 0,
            fail_after,
            counter: Arc::clone(&self.bytes_read),
        })
    }
}
