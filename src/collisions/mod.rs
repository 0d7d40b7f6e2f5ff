//! Hash collision disambiguation.
//!
//! This module provides functionality for:
//! - Checksum bucketing of manifest records
//! - Size grouping within a bucket (plain collisions need no reads)
//! - Lazy, chunked byte sources
//! - Content clustering of same-sized files
//!
//! The engine consumes checksums as opaque strings and reaches the disk only
//! through the [`FileSystem`] trait.

pub mod bucket;
pub mod cluster;
pub mod finder;
pub mod fs;
pub mod groups;
pub mod lazy;

#[cfg(test)]
pub(crate) mod testutil;

pub use bucket::{bucket_by_checksum, ChecksumBuckets};
pub use cluster::{
    cluster_by_content, equal, ClusterConfig, ClusterOutcome, ClusterStats, CompareError,
    ContentCluster, Side, UnclusteredFile,
};
pub use finder::{
    BucketAnalysis, CollisionFinder, CollisionKind, CollisionReport, CollisionSummary,
    FinderConfig, FinderError, SizeClusters,
};
pub use fs::{FileSystem, LocalFs};
pub use groups::{group_by_size, MetadataError, SizeGroup, SizeGroups};
pub use lazy::{ContentError, LazyByteSource, SourceState, DEFAULT_CHUNK_SIZE};
