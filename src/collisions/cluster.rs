//! Content-equality clustering of same-sized files.
//!
//! # Overview
//!
//! Files that share a checksum and a length may still differ. This module
//! splits such a group into [`ContentCluster`]s of byte-identical files:
//!
//! 1. Clusters are kept in creation order, each anchored by its first member
//!    (the representative) whose [`LazyByteSource`] stays resident.
//! 2. Each incoming file is compared against the representatives in order
//!    and joins the first one it equals. Equality is transitive, so one
//!    comparison per cluster is enough.
//! 3. A file that equals no representative starts a new cluster.
//! 4. A file whose comparison fails on I/O is reported as unclusterable
//!    instead of being treated as different.
//!
//! Comparisons read both files chunk by chunk and stop at the first chunk
//! that differs, so most collisions are disproved after a single chunk.
//!
//! # Example
//!
//! ```no_run
//! use rustsums::collisions::{cluster_by_content, ClusterConfig, LocalFs};
//!
//! let fs = LocalFs::rooted("/data");
//! let names = vec!["a.bin".to_string(), "b.bin".to_string()];
//! let outcome = cluster_by_content(&fs, 1024, &names, &ClusterConfig::default());
//!
//! for cluster in &outcome.clusters {
//!     println!("{:?}", cluster.files());
//! }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use super::fs::FileSystem;
use super::lazy::{ContentError, LazyByteSource, DEFAULT_CHUNK_SIZE};

/// Which operand of [`equal`] failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The first operand.
    Left,
    /// The second operand.
    Right,
}

/// An I/O failure during a comparison, attributed to one operand.
#[derive(thiserror::Error, Debug)]
#[error("comparison failed on {side:?} operand: {source}")]
pub struct CompareError {
    /// Operand whose read failed
    pub side: Side,
    /// The underlying content error
    #[source]
    pub source: ContentError,
}

/// Byte-for-byte equality of two sources.
///
/// Sources of different sizes are unequal without any read. Otherwise both
/// are materialized one chunk at a time (using the left source's chunk size)
/// and the comparison stops at the first differing chunk. Zero-length files
/// are equal without any read.
///
/// # Errors
///
/// Returns [`CompareError`] naming the operand whose read failed.
pub fn equal<F: FileSystem>(
    a: &mut LazyByteSource<'_, F>,
    b: &mut LazyByteSource<'_, F>,
) -> Result<bool, CompareError> {
    if a.size() != b.size() {
        return Ok(false);
    }

    let size = a.size();
    let chunk = a.chunk_size() as u64;
    let mut offset = 0u64;

    while offset < size {
        let next = size.min(offset + chunk);
        a.ensure(next).map_err(|source| CompareError {
            side: Side::Left,
            source,
        })?;
        b.ensure(next).map_err(|source| CompareError {
            side: Side::Right,
            source,
        })?;

        let range = offset as usize..next as usize;
        if a.bytes()[range.clone()] != b.bytes()[range] {
            log::trace!(
                "{} and {} differ within [{}, {})",
                a.path().display(),
                b.path().display(),
                offset,
                next
            );
            return Ok(false);
        }
        offset = next;
    }

    Ok(true)
}

/// Files proven byte-identical to each other.
///
/// A cluster always holds at least one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentCluster {
    files: Vec<String>,
}

impl ContentCluster {
    /// Create a cluster holding a single file.
    #[must_use]
    pub fn singleton(file: impl Into<String>) -> Self {
        Self {
            files: vec![file.into()],
        }
    }

    /// Create a cluster from its members, representative first.
    ///
    /// Returns `None` for an empty list.
    #[must_use]
    pub fn from_files(files: Vec<String>) -> Option<Self> {
        (!files.is_empty()).then_some(Self { files })
    }

    /// Members in manifest order; the first is the representative.
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// The comparison anchor of this cluster.
    #[must_use]
    pub fn representative(&self) -> &str {
        self.files.first().map_or("", String::as_str)
    }

    /// Number of files in this cluster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Always false; see [`ContentCluster::from_files`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether this cluster holds true duplicates (2+ files).
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.files.len() > 1
    }
}

/// A file left out of clustering because its content could not be read.
#[derive(Debug)]
pub struct UnclusteredFile {
    /// Manifest filename
    pub filename: String,
    /// Why it could not be compared
    pub error: ContentError,
}

/// Configuration for a clustering pass.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Chunk size for incremental reads.
    pub chunk_size: usize,
    /// Optional cancellation flag, polled between files.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional cap on the bytes read by all passes sharing this config,
    /// checked between files.
    pub max_bytes_read: Option<u64>,
    /// Bytes read so far, shared by clones of this config.
    spent: Arc<AtomicU64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            shutdown_flag: None,
            max_bytes_read: None,
            spent: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl ClusterConfig {
    /// Set the chunk size (minimum 1).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the byte budget for a whole run.
    #[must_use]
    pub fn with_max_bytes_read(mut self, max: Option<u64>) -> Self {
        self.max_bytes_read = max;
        self
    }

    /// Check if shutdown has been requested.
    pub(crate) fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Bytes read by every pass run with this config (or a clone of it).
    #[must_use]
    pub fn bytes_spent(&self) -> u64 {
        self.spent.load(Ordering::SeqCst)
    }

    pub(crate) fn reset_budget(&self) {
        self.spent.store(0, Ordering::SeqCst);
    }

    fn is_budget_exhausted(&self) -> bool {
        self.max_bytes_read
            .is_some_and(|max| self.bytes_spent() >= max)
    }

    fn charge(&self, bytes: u64) {
        self.spent.fetch_add(bytes, Ordering::SeqCst);
    }
}

/// Statistics from one clustering pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterStats {
    /// Files that entered the pass
    pub input_files: usize,
    /// Representative comparisons performed
    pub comparisons: usize,
    /// Bytes read from disk, both operands included
    pub bytes_read: u64,
    /// Whether the pass stopped on the shutdown flag
    pub interrupted: bool,
    /// Whether the pass stopped on the byte budget
    pub budget_exhausted: bool,
}

/// Result of clustering one size group.
#[derive(Debug, Default)]
pub struct ClusterOutcome {
    /// Clusters in creation order
    pub clusters: Vec<ContentCluster>,
    /// Files that could not be read
    pub errors: Vec<UnclusteredFile>,
    /// Files not processed because the pass stopped early
    pub skipped: Vec<String>,
    /// Pass statistics
    pub stats: ClusterStats,
}

struct Slot<'fs, F: FileSystem> {
    source: LazyByteSource<'fs, F>,
    members: Vec<String>,
    active: bool,
}

/// Partition files of one known `size` into content clusters.
///
/// Files are processed in the given order; the first file of each cluster
/// becomes its representative. Read failures are isolated to the file they
/// belong to.
///
/// When a representative fails to read, it is moved to the error list and
/// its cluster stops accepting files; the candidate goes on to the remaining
/// clusters.
#[must_use]
pub fn cluster_by_content<F: FileSystem>(
    fs: &F,
    size: u64,
    filenames: &[String],
    config: &ClusterConfig,
) -> ClusterOutcome {
    let mut outcome = ClusterOutcome::default();
    outcome.stats.input_files = filenames.len();
    let mut slots: Vec<Slot<'_, F>> = Vec::new();

    log::debug!(
        "Clustering {} file(s) of {} bytes",
        filenames.len(),
        size
    );

    for (idx, name) in filenames.iter().enumerate() {
        if config.is_shutdown_requested() {
            log::debug!("Clustering interrupted, skipping {} file(s)", filenames.len() - idx);
            outcome.stats.interrupted = true;
            outcome.skipped.extend(filenames[idx..].iter().cloned());
            break;
        }
        if config.is_budget_exhausted() {
            log::warn!(
                "Read budget exhausted after {} bytes, skipping {} file(s)",
                config.bytes_spent(),
                filenames.len() - idx
            );
            outcome.stats.budget_exhausted = true;
            outcome.skipped.extend(filenames[idx..].iter().cloned());
            break;
        }

        let mut candidate = LazyByteSource::new(fs, PathBuf::from(name), size, config.chunk_size);
        let mut placed = false;
        let mut failure = None;
        let mut i = 0;

        while i < slots.len() {
            if !slots[i].active {
                i += 1;
                continue;
            }

            let before = slots[i].source.loaded() + candidate.loaded();
            let result = equal(&mut slots[i].source, &mut candidate);
            outcome.stats.comparisons += 1;
            let read = slots[i].source.loaded() + candidate.loaded() - before;
            outcome.stats.bytes_read += read;
            config.charge(read);

            match result {
                Ok(true) => {
                    log::trace!("{} matches {}", name, slots[i].members[0]);
                    slots[i].members.push(name.clone());
                    placed = true;
                    break;
                }
                Ok(false) => i += 1,
                Err(CompareError {
                    side: Side::Right,
                    source,
                }) => {
                    failure = Some(source);
                    break;
                }
                Err(CompareError {
                    side: Side::Left,
                    source,
                }) => {
                    let slot = &mut slots[i];
                    let representative = slot.members.remove(0);
                    log::warn!("Dropping unreadable representative {}: {}", representative, source);
                    slot.source.close();
                    outcome.errors.push(UnclusteredFile {
                        filename: representative,
                        error: source,
                    });
                    if slot.members.is_empty() {
                        slots.remove(i);
                    } else {
                        slot.active = false;
                        i += 1;
                    }
                }
            }
        }

        if let Some(error) = failure {
            log::warn!("Cannot compare {}: {}", name, error);
            candidate.close();
            outcome.errors.push(UnclusteredFile {
                filename: name.clone(),
                error,
            });
        } else if placed {
            candidate.close();
        } else {
            slots.push(Slot {
                source: candidate,
                members: vec![name.clone()],
                active: true,
            });
        }
    }

    for slot in &mut slots {
        slot.source.close();
    }
    outcome.clusters = slots
        .into_iter()
        .filter_map(|slot| ContentCluster::from_files(slot.members))
        .collect();

    log::debug!(
        "Clustered into {} cluster(s) with {} comparison(s), {} bytes read",
        outcome.clusters.len(),
        outcome.stats.comparisons,
        outcome.stats.bytes_read
    );

    outcome
}
