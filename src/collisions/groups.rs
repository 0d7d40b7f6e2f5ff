//! Size-based partitioning of a checksum bucket.
//!
//! # Overview
//!
//! Files of different lengths cannot be identical, so the first step in
//! telling a true duplicate from a hash collision is to split each bucket by
//! file length. When every file in a bucket ends up alone in its size group,
//! the bucket is a *plain collision* and no content is ever read.
//!
//! Metadata lookups that fail (typically a file removed after the manifest
//! was written) are collected in [`SizeGroups::unreadable`] and never stop
//! the grouping of the other files.
//!
//! # Example
//!
//! ```no_run
//! use rustsums::collisions::{group_by_size, LocalFs};
//!
//! let fs = LocalFs::rooted("/data");
//! let files = vec!["a.txt".to_string(), "b.bin".to_string()];
//! let groups = group_by_size(&fs, &files);
//!
//! if groups.is_plain_collision() {
//!     println!("all sizes differ: plain collision");
//! }
//! ```

use std::io;
use std::path::Path;

use serde::Serialize;

use super::fs::FileSystem;

/// Files of one bucket sharing an exact length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeGroup {
    /// File size in bytes (shared by all files in this group)
    pub size: u64,
    /// Files with this exact size, in manifest order
    pub files: Vec<String>,
}

impl SizeGroup {
    /// Create an empty size group.
    #[must_use]
    pub fn new(size: u64) -> Self {
        Self {
            size,
            files: Vec::new(),
        }
    }

    /// Add a file to this group.
    pub fn add(&mut self, file: impl Into<String>) {
        self.files.push(file.into());
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether content comparison is needed (2+ files).
    #[must_use]
    pub fn needs_comparison(&self) -> bool {
        self.files.len() > 1
    }
}

/// A file whose metadata could not be read.
#[derive(thiserror::Error, Debug)]
#[error("cannot stat {filename}: {source}")]
pub struct MetadataError {
    /// Manifest filename
    pub filename: String,
    /// The underlying I/O error
    #[source]
    pub source: io::Error,
}

/// Size partition of one checksum bucket.
#[derive(Debug, Default)]
pub struct SizeGroups {
    /// Size-keyed groups in order of first appearance
    pub groups: Vec<SizeGroup>,
    /// Files whose length could not be determined
    pub unreadable: Vec<MetadataError>,
}

impl SizeGroups {
    /// Number of size-keyed groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// No size group and no unreadable file.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.unreadable.is_empty()
    }

    /// Number of files with a known size.
    #[must_use]
    pub fn readable_files(&self) -> usize {
        self.groups.iter().map(SizeGroup::len).sum()
    }

    /// Look up the group for `size`.
    #[must_use]
    pub fn get(&self, size: u64) -> Option<&SizeGroup> {
        self.groups.iter().find(|g| g.size == size)
    }

    /// Every readable file has a size of its own.
    ///
    /// Such a bucket is a plain collision: sizes already prove that no two
    /// files are identical, so no content comparison is needed.
    #[must_use]
    pub fn is_plain_collision(&self) -> bool {
        self.groups.iter().all(|g| g.len() == 1)
    }
}

/// Group the files of one checksum bucket by length.
///
/// Each lookup goes through `fs`; a failed lookup is isolated to its file.
/// The first appearance of a size decides the position of its group, and
/// files keep their input order within a group.
#[must_use]
pub fn group_by_size<F: FileSystem>(fs: &F, filenames: &[String]) -> SizeGroups {
    let mut result = SizeGroups::default();

    for name in filenames {
        match fs.len(Path::new(name)) {
            Ok(size) => match result.groups.iter_mut().find(|g| g.size == size) {
                Some(group) => group.add(name.as_str()),
                None => {
                    let mut group = SizeGroup::new(size);
                    group.add(name.as_str());
                    result.groups.push(group);
                }
            },
            Err(source) => {
                log::warn!("Cannot stat {}: {}", name, source);
                result.unreadable.push(MetadataError {
                    filename: name.clone(),
                    source,
                });
            }
        }
    }

    log::trace!(
        "Grouped {} file(s) into {} size group(s), {} unreadable",
        filenames.len(),
        result.groups.len(),
        result.unreadable.len()
    );

    result
}
