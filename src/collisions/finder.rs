//! Collision analysis pipeline.
//!
//! # Overview
//!
//! This module runs the whole disambiguation for a manifest:
//! 1. **Bucketing**: group records by checksum (see [`crate::collisions::bucket`])
//! 2. **Size grouping**: split each shared checksum by file length
//! 3. **Content clustering**: compare same-sized files chunk by chunk
//!
//! Buckets are independent of each other and are analysed in parallel.
//! Inside one size group the clustering stays sequential, so the first file
//! seen always becomes the representative and results are stable.
//!
//! # Example
//!
//! ```no_run
//! use rustsums::collisions::{CollisionFinder, FinderConfig, LocalFs};
//! use rustsums::manifest::ManifestRecord;
//!
//! let records = vec![
//!     ManifestRecord::new("3b5d", "a.txt"),
//!     ManifestRecord::new("3b5d", "b.txt"),
//! ];
//! let finder = CollisionFinder::new(FinderConfig::default(), LocalFs::rooted("/data"));
//! let report = finder.analyze(&records).unwrap();
//!
//! println!("{} colliding checksum(s)", report.summary.colliding_buckets);
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;

use super::bucket::bucket_by_checksum;
use super::cluster::{cluster_by_content, ClusterConfig, ClusterStats, ContentCluster, UnclusteredFile};
use super::fs::FileSystem;
use super::groups::{group_by_size, SizeGroups};
use crate::manifest::ManifestRecord;
use crate::progress::ProgressCallback;

/// Configuration for the collision finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of threads analysing buckets in parallel.
    pub io_threads: usize,
    /// Settings for each content clustering pass.
    pub cluster: ClusterConfig,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("io_threads", &self.io_threads)
            .field("cluster", &self.cluster)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            io_threads: 4,
            cluster: ClusterConfig::default(),
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the thread count (minimum 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the chunk size for content comparison.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.cluster = self.cluster.with_chunk_size(chunk_size);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cluster = self.cluster.with_shutdown_flag(flag);
        self
    }

    /// Cap the bytes read by a whole analysis.
    #[must_use]
    pub fn with_max_bytes_read(mut self, max: Option<u64>) -> Self {
        self.cluster = self.cluster.with_max_bytes_read(max);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }
}

/// How the files under one checksum relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionKind {
    /// Every file has a distinct size: all of them genuinely collide.
    Plain,
    /// Some files share a size and were compared by content.
    Mixed,
}

/// Content clusters found inside one size group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeClusters {
    /// Shared file size in bytes
    pub size: u64,
    /// Clusters in creation order
    pub clusters: Vec<ContentCluster>,
}

/// Analysis of one checksum shared by several manifest entries.
#[derive(Debug)]
pub struct BucketAnalysis {
    /// The shared checksum
    pub checksum: String,
    /// Files in manifest order
    pub files: Vec<String>,
    /// Plain or mixed collision
    pub kind: CollisionKind,
    /// Size partition of the bucket
    pub size_groups: SizeGroups,
    /// Content clusters per size group
    pub clusters: Vec<SizeClusters>,
    /// Files whose content could not be compared
    pub content_errors: Vec<UnclusteredFile>,
    /// Files left out because analysis stopped early
    pub skipped: Vec<String>,
    /// Clustering statistics for this bucket
    pub stats: ClusterStats,
}

impl BucketAnalysis {
    /// All content clusters of the bucket, across size groups.
    pub fn all_clusters(&self) -> impl Iterator<Item = &ContentCluster> {
        self.clusters.iter().flat_map(|sc| sc.clusters.iter())
    }

    /// Clusters holding true duplicates.
    pub fn duplicate_clusters(&self) -> impl Iterator<Item = &ContentCluster> {
        self.all_clusters().filter(|c| c.has_duplicates())
    }

    /// Whether any file of this bucket could not be analysed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.size_groups.unreadable.is_empty() || !self.content_errors.is_empty()
    }
}

/// Summary statistics of a collision analysis.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollisionSummary {
    /// Manifest records analysed
    pub total_records: usize,
    /// Distinct checksums in the manifest
    pub distinct_checksums: usize,
    /// Checksums shared by 2+ records
    pub colliding_buckets: usize,
    /// Buckets whose files all differ in size
    pub plain_collisions: usize,
    /// Buckets that needed content comparison
    pub mixed_collisions: usize,
    /// Clusters of 2+ byte-identical files
    pub duplicate_clusters: usize,
    /// Files whose metadata could not be read
    pub unreadable_files: usize,
    /// Files whose content could not be read
    pub content_errors: usize,
    /// Files left out because analysis stopped early
    pub skipped_files: usize,
    /// Content comparisons performed
    pub comparisons: usize,
    /// Bytes read during content comparison
    pub bytes_read: u64,
    /// Whether the analysis was interrupted
    pub interrupted: bool,
    /// Whether the byte budget ran out before every file was compared
    pub budget_exhausted: bool,
    /// Duration of the analysis
    #[serde(skip)]
    pub duration: Duration,
}

impl CollisionSummary {
    /// Whether any per-file error was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.unreadable_files > 0 || self.content_errors > 0
    }

    /// Whether files were left uncompared by an interruption or the budget.
    #[must_use]
    pub fn stopped_early(&self) -> bool {
        self.interrupted || self.budget_exhausted
    }
}

/// Full result of a collision analysis.
#[derive(Debug, Default)]
pub struct CollisionReport {
    /// Colliding buckets sorted by checksum
    pub buckets: Vec<BucketAnalysis>,
    /// Aggregate statistics
    pub summary: CollisionSummary,
}

impl CollisionReport {
    /// Clusters of true duplicates with their checksum, in report order.
    pub fn duplicate_clusters(&self) -> impl Iterator<Item = (&str, &ContentCluster)> {
        self.buckets.iter().flat_map(|b| {
            b.duplicate_clusters()
                .map(move |cluster| (b.checksum.as_str(), cluster))
        })
    }

    /// Whether no checksum is shared.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Errors that abort a collision analysis.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The analysis was interrupted before it started.
    #[error("Analysis interrupted by user")]
    Interrupted,
}

/// Orchestrates bucketing, size grouping and content clustering.
pub struct CollisionFinder<F: FileSystem> {
    config: FinderConfig,
    fs: F,
}

impl<F: FileSystem> CollisionFinder<F> {
    /// Create a finder reading files through `fs`.
    #[must_use]
    pub fn new(config: FinderConfig, fs: F) -> Self {
        Self { config, fs }
    }

    /// The filesystem used for lookups.
    #[must_use]
    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Analyse every checksum shared by more than one record.
    ///
    /// Per-file failures are reported inside the result. A shutdown request
    /// or an exhausted byte budget during the run is flagged in the summary
    /// and leaves the unprocessed files in `skipped`. The budget restarts at
    /// zero on every call.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Interrupted`] if shutdown was requested before
    /// the analysis started.
    pub fn analyze(&self, records: &[ManifestRecord]) -> Result<CollisionReport, FinderError> {
        let start = Instant::now();
        if self.config.cluster.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }
        self.config.cluster.reset_budget();

        let buckets = bucket_by_checksum(records);
        let colliding: Vec<(&str, &[String])> = buckets
            .sorted()
            .into_iter()
            .filter(|(_, files)| files.len() > 1)
            .collect();

        log::info!(
            "{} record(s), {} checksum(s), {} shared",
            records.len(),
            buckets.len(),
            colliding.len()
        );

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("collisions", colliding.len());
        }

        let done = AtomicUsize::new(0);
        let analyse = |(checksum, files): &(&str, &[String])| {
            let analysis = self.analyze_bucket(checksum, files);
            if let Some(ref callback) = self.config.progress_callback {
                callback.on_progress(done.fetch_add(1, Ordering::Relaxed) + 1, checksum);
            }
            analysis
        };

        let analyses: Vec<BucketAnalysis> = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads)
            .build()
        {
            Ok(pool) => pool.install(|| colliding.par_iter().map(analyse).collect()),
            Err(e) => {
                log::warn!("Failed to create thread pool ({}), analysing sequentially", e);
                colliding.iter().map(analyse).collect()
            }
        };

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("collisions");
        }

        let mut summary = CollisionSummary {
            total_records: records.len(),
            distinct_checksums: buckets.len(),
            colliding_buckets: analyses.len(),
            interrupted: self.config.cluster.is_shutdown_requested(),
            ..Default::default()
        };
        for analysis in &analyses {
            match analysis.kind {
                CollisionKind::Plain => summary.plain_collisions += 1,
                CollisionKind::Mixed => summary.mixed_collisions += 1,
            }
            summary.duplicate_clusters += analysis.duplicate_clusters().count();
            summary.unreadable_files += analysis.size_groups.unreadable.len();
            summary.content_errors += analysis.content_errors.len();
            summary.skipped_files += analysis.skipped.len();
            summary.comparisons += analysis.stats.comparisons;
            summary.bytes_read += analysis.stats.bytes_read;
            summary.interrupted |= analysis.stats.interrupted;
            summary.budget_exhausted |= analysis.stats.budget_exhausted;
        }
        summary.duration = start.elapsed();

        log::info!(
            "Analysis complete: {} plain, {} mixed, {} duplicate cluster(s), {} comparison(s)",
            summary.plain_collisions,
            summary.mixed_collisions,
            summary.duplicate_clusters,
            summary.comparisons
        );

        Ok(CollisionReport {
            buckets: analyses,
            summary,
        })
    }

    /// Analyse the files sharing one checksum.
    #[must_use]
    pub fn analyze_bucket(&self, checksum: &str, files: &[String]) -> BucketAnalysis {
        let size_groups = group_by_size(&self.fs, files);
        let mut analysis = BucketAnalysis {
            checksum: checksum.to_string(),
            files: files.to_vec(),
            kind: CollisionKind::Plain,
            size_groups,
            clusters: Vec::new(),
            content_errors: Vec::new(),
            skipped: Vec::new(),
            stats: ClusterStats::default(),
        };

        if analysis.size_groups.is_plain_collision() {
            log::debug!("{}: plain collision across {} size(s)", checksum, analysis.size_groups.len());
            analysis.clusters = analysis
                .size_groups
                .groups
                .iter()
                .map(|g| SizeClusters {
                    size: g.size,
                    clusters: g.files.iter().cloned().map(ContentCluster::singleton).collect(),
                })
                .collect();
            return analysis;
        }

        analysis.kind = CollisionKind::Mixed;
        for group in &analysis.size_groups.groups {
            if !group.needs_comparison() {
                analysis.clusters.push(SizeClusters {
                    size: group.size,
                    clusters: group.files.iter().cloned().map(ContentCluster::singleton).collect(),
                });
                continue;
            }

            let outcome = cluster_by_content(&self.fs, group.size, &group.files, &self.config.cluster);
            analysis.stats.input_files += outcome.stats.input_files;
            analysis.stats.comparisons += outcome.stats.comparisons;
            analysis.stats.bytes_read += outcome.stats.bytes_read;
            analysis.stats.interrupted |= outcome.stats.interrupted;
            analysis.stats.budget_exhausted |= outcome.stats.budget_exhausted;
            analysis.content_errors.extend(outcome.errors);
            analysis.skipped.extend(outcome.skipped);
            analysis.clusters.push(SizeClusters {
                size: group.size,
                clusters: outcome.clusters,
            });
        }

        analysis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collisions::testutil::MemoryFs;

    fn record(checksum: &str, filename: &str) -> ManifestRecord {
        ManifestRecord::new(checksum, filename)
    }

    fn cluster_files(analysis: &BucketAnalysis) -> Vec<Vec<String>> {
        analysis.all_clusters().map(|c| c.files().to_vec()).collect()
    }

    #[test]
    fn test_finder_config_default() {
        let config = FinderConfig::default();
        assert_eq!(config.io_threads, 4);
        assert!(config.progress_callback.is_none());
        assert_eq!(config.cluster.chunk_size, 4096);
    }

    #[test]
    fn test_finder_config_builder() {
        let config = FinderConfig::default()
            .with_io_threads(0)
            .with_chunk_size(512)
            .with_max_bytes_read(Some(1024));

        assert_eq!(config.io_threads, 1);
        assert_eq!(config.cluster.chunk_size, 512);
        assert_eq!(config.cluster.max_bytes_read, Some(1024));
    }

    #[test]
    fn test_analyze_empty_manifest() {
        let finder = CollisionFinder::new(FinderConfig::default(), MemoryFs::new());
        let report = finder.analyze(&[]).unwrap();

        assert!(report.is_clean());
        assert_eq!(report.summary.total_records, 0);
    }

    #[test]
    fn test_analyze_ignores_unique_checksums() {
        let fs = MemoryFs::new()
            .with_file("a", vec![1u8; 4])
            .with_file("b", vec![2u8; 4]);
        let finder = CollisionFinder::new(FinderConfig::default(), fs);

        let report = finder
            .analyze(&[record("11", "a"), record("22", "b")])
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.summary.distinct_checksums, 2);
        assert_eq!(finder.fs().opens(), 0);
    }

    #[test]
    fn test_analyze_plain_collision() {
        let fs = MemoryFs::new()
            .with_file("a.txt", vec![0u8; 10])
            .with_file("b.bin", vec![0u8; 20])
            .with_file("c.dat", vec![0u8; 30]);
        let finder = CollisionFinder::new(FinderConfig::default(), fs);
        let records = vec![record("ff", "a.txt"), record("ff", "b.bin"), record("ff", "c.dat")];

        let report = finder.analyze(&records).unwrap();

        assert_eq!(report.buckets.len(), 1);
        let bucket = &report.buckets[0];
        assert_eq!(bucket.kind, CollisionKind::Plain);
        assert_eq!(bucket.size_groups.len(), 3);
        assert_eq!(cluster_files(bucket).len(), 3);
        assert_eq!(report.summary.comparisons, 0);
        assert_eq!(finder.fs().bytes_read(), 0);
        assert_eq!(report.summary.plain_collisions, 1);
    }

    #[test]
    fn test_analyze_mixed_collision() {
        let same = vec![1u8; 100];
        let mut other = same.clone();
        other[99] = 2;
        let fs = MemoryFs::new()
            .with_file("a", same.clone())
            .with_file("b", same)
            .with_file("c", other)
            .with_file("d", vec![1u8; 7]);
        let finder = CollisionFinder::new(FinderConfig::default(), fs);
        let records = vec![
            record("ee", "a"),
            record("ee", "b"),
            record("ee", "c"),
            record("ee", "d"),
        ];

        let report = finder.analyze(&records).unwrap();
        let bucket = &report.buckets[0];

        assert_eq!(bucket.kind, CollisionKind::Mixed);
        assert_eq!(
            cluster_files(bucket),
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string()],
                vec!["d".to_string()],
            ]
        );
        assert_eq!(report.summary.duplicate_clusters, 1);
        let dups: Vec<_> = report.duplicate_clusters().collect();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].0, "ee");
    }

    #[test]
    fn test_analyze_isolated_metadata_failure() {
        let fs = MemoryFs::new().with_file("e.txt", vec![1u8; 5]);
        let finder = CollisionFinder::new(FinderConfig::default(), fs);
        let records = vec![record("dd", "d.txt"), record("dd", "e.txt")];

        let report = finder.analyze(&records).unwrap();
        let bucket = &report.buckets[0];

        assert_eq!(bucket.size_groups.unreadable.len(), 1);
        assert_eq!(bucket.size_groups.unreadable[0].filename, "d.txt");
        assert_eq!(cluster_files(bucket), vec![vec!["e.txt".to_string()]]);
        assert!(bucket.has_errors());
        assert!(report.summary.has_errors());
    }

    #[test]
    fn test_analyze_buckets_sorted_by_checksum() {
        let fs = MemoryFs::new()
            .with_file("a", vec![1u8; 1])
            .with_file("b", vec![1u8; 2])
            .with_file("c", vec![1u8; 3])
            .with_file("d", vec![1u8; 4]);
        let finder = CollisionFinder::new(FinderConfig::default().with_io_threads(2), fs);
        let records = vec![
            record("zz", "a"),
            record("aa", "b"),
            record("zz", "c"),
            record("aa", "d"),
        ];

        let report = finder.analyze(&records).unwrap();
        let order: Vec<_> = report.buckets.iter().map(|b| b.checksum.as_str()).collect();
        assert_eq!(order, vec!["aa", "zz"]);
    }

    #[test]
    fn test_analyze_interrupted_before_start() {
        let flag = Arc::new(AtomicBool::new(true));
        let finder = CollisionFinder::new(
            FinderConfig::default().with_shutdown_flag(flag),
            MemoryFs::new(),
        );

        assert!(matches!(finder.analyze(&[]), Err(FinderError::Interrupted)));
    }

    fn identical_pairs(buckets: usize, size: usize) -> (MemoryFs, Vec<ManifestRecord>) {
        let mut fs = MemoryFs::new();
        let mut records = Vec::new();
        for i in 0..buckets {
            for side in ["l", "r"] {
                let name = format!("{i}{side}");
                fs = fs.with_file(&name, vec![i as u8; size]);
                records.push(record(&format!("{i:02}"), &name));
            }
        }
        (fs, records)
    }

    #[test]
    fn test_byte_budget_covers_whole_analysis() {
        let (fs, records) = identical_pairs(5, 1000);
        let config = FinderConfig::default()
            .with_io_threads(1)
            .with_max_bytes_read(Some(1000));
        let finder = CollisionFinder::new(config, fs);

        let report = finder.analyze(&records).unwrap();

        assert!(report.summary.budget_exhausted);
        assert!(report.summary.stopped_early());
        assert_eq!(report.summary.bytes_read, 2000);
        assert_eq!(finder.fs().bytes_read(), 2000);
        assert_eq!(report.summary.skipped_files, 8);
        assert_eq!(report.summary.duplicate_clusters, 1);

        let again = finder.analyze(&records).unwrap();
        assert_eq!(again.summary.bytes_read, 2000);
    }

    #[derive(Default)]
    struct Positions(std::sync::Mutex<Vec<usize>>);

    impl ProgressCallback for Positions {
        fn on_phase_start(&self, _phase: &str, _total: usize) {}

        fn on_progress(&self, current: usize, _item: &str) {
            self.0.lock().unwrap().push(current);
        }

        fn on_phase_end(&self, _phase: &str) {}
    }

    #[test]
    fn test_progress_positions_count_up_across_threads() {
        let (fs, records) = identical_pairs(16, 64);
        let positions = Arc::new(Positions::default());
        let config = FinderConfig::default()
            .with_io_threads(4)
            .with_progress_callback(positions.clone());

        CollisionFinder::new(config, fs).analyze(&records).unwrap();

        let mut seen = positions.0.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (1..=16).collect::<Vec<_>>());
    }
}
