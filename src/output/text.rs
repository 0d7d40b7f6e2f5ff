//! Human-readable collision report.
//!
//! Each shared checksum is printed as a block. A plain collision lists its
//! files with their sizes:
//!
//! ```text
//! 3b5d3c7d207e37dceeedd301e35e2e58  plain collision
//!     a.txt  (10 B)
//!     b.txt  (12 B)
//! ```
//!
//! A mixed collision lists the content clusters of each size, then files
//! that could not be analysed:
//!
//! ```text
//! 3b5d3c7d207e37dceeedd301e35e2e58  mixed collision
//!     100 B
//!         identical: a.txt, c.txt
//!         distinct:  b.txt
//!     unreadable: cannot stat d.txt: No such file or directory
//! ```

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use crate::collisions::{BucketAnalysis, CollisionKind, CollisionReport, CollisionSummary};

/// Renders a [`CollisionReport`] as text.
pub struct TextOutput<'a> {
    report: &'a CollisionReport,
    color: bool,
}

impl<'a> TextOutput<'a> {
    /// Create a renderer.
    #[must_use]
    pub fn new(report: &'a CollisionReport, color: bool) -> Self {
        Self { report, color }
    }

    fn header(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn identical(&self, text: &str) -> String {
        if self.color {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    fn problem(&self, text: &str) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.report.is_clean() {
            writeln!(writer, "No shared checksums.")?;
            return self.write_summary(writer, &self.report.summary);
        }

        for bucket in &self.report.buckets {
            match bucket.kind {
                CollisionKind::Plain => self.write_plain(writer, bucket)?,
                CollisionKind::Mixed => self.write_mixed(writer, bucket)?,
            }
            writeln!(writer)?;
        }
        self.write_summary(writer, &self.report.summary)
    }

    fn write_plain<W: Write>(&self, writer: &mut W, bucket: &BucketAnalysis) -> io::Result<()> {
        writeln!(
            writer,
            "{}  {}",
            self.header(&bucket.checksum),
            self.problem("plain collision")
        )?;
        for group in &bucket.size_groups.groups {
            for file in &group.files {
                writeln!(writer, "    {}  ({})", file, ByteSize(group.size))?;
            }
        }
        self.write_problems(writer, bucket)
    }

    fn write_mixed<W: Write>(&self, writer: &mut W, bucket: &BucketAnalysis) -> io::Result<()> {
        writeln!(writer, "{}  mixed collision", self.header(&bucket.checksum))?;
        for size_clusters in &bucket.clusters {
            writeln!(writer, "    {}", ByteSize(size_clusters.size))?;
            for cluster in &size_clusters.clusters {
                if cluster.has_duplicates() {
                    writeln!(
                        writer,
                        "        {} {}",
                        self.identical("identical:"),
                        cluster.files().join(", ")
                    )?;
                } else {
                    writeln!(writer, "        distinct:  {}", cluster.files().join(", "))?;
                }
            }
        }
        self.write_problems(writer, bucket)
    }

    fn write_problems<W: Write>(&self, writer: &mut W, bucket: &BucketAnalysis) -> io::Result<()> {
        for err in &bucket.size_groups.unreadable {
            writeln!(writer, "    {} {}", self.problem("unreadable:"), err)?;
        }
        for unclustered in &bucket.content_errors {
            writeln!(
                writer,
                "    {} {}: {}",
                self.problem("error:"),
                unclustered.filename,
                unclustered.error
            )?;
        }
        for file in &bucket.skipped {
            writeln!(writer, "    skipped: {file}")?;
        }
        Ok(())
    }

    fn write_summary<W: Write>(&self, writer: &mut W, summary: &CollisionSummary) -> io::Result<()> {
        writeln!(
            writer,
            "{} record(s), {} checksum(s), {} shared: {} plain, {} mixed, {} duplicate cluster(s)",
            summary.total_records,
            summary.distinct_checksums,
            summary.colliding_buckets,
            summary.plain_collisions,
            summary.mixed_collisions,
            summary.duplicate_clusters
        )?;
        if summary.comparisons > 0 {
            writeln!(
                writer,
                "{} comparison(s), {} read",
                summary.comparisons,
                ByteSize(summary.bytes_read)
            )?;
        }
        if summary.has_errors() {
            writeln!(
                writer,
                "{}",
                self.problem(&format!(
                    "{} unreadable file(s), {} content error(s)",
                    summary.unreadable_files, summary.content_errors
                ))
            )?;
        }
        if summary.stopped_early() || summary.skipped_files > 0 {
            let reason = if summary.budget_exhausted && !summary.interrupted {
                "read budget exhausted"
            } else {
                "stopped early"
            };
            writeln!(
                writer,
                "Analysis {}; {} file(s) skipped",
                reason, summary.skipped_files
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collisions::testutil::MemoryFs;
    use crate::collisions::{CollisionFinder, FinderConfig};
    use crate::manifest::ManifestRecord;

    fn render(report: &CollisionReport) -> String {
        let mut out = Vec::new();
        TextOutput::new(report, false).write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn analyze(fs: MemoryFs, records: &[ManifestRecord]) -> CollisionReport {
        CollisionFinder::new(FinderConfig::default(), fs)
            .analyze(records)
            .unwrap()
    }

    #[test]
    fn test_clean_report() {
        let report = analyze(MemoryFs::new(), &[ManifestRecord::new("aa", "x")]);
        let text = render(&report);
        assert!(text.starts_with("No shared checksums."));
        assert!(text.contains("1 record(s), 1 checksum(s), 0 shared"));
    }

    #[test]
    fn test_plain_collision_lists_files() {
        let fs = MemoryFs::new()
            .with_file("a.txt", vec![1; 10])
            .with_file("b.txt", vec![1; 20]);
        let records = [ManifestRecord::new("cafe", "a.txt"), ManifestRecord::new("cafe", "b.txt")];
        let text = render(&analyze(fs, &records));

        assert!(text.contains("cafe  plain collision"));
        assert!(text.contains("    a.txt  ("));
        assert!(text.contains("    b.txt  ("));
        assert!(!text.contains("identical"));
    }

    #[test]
    fn test_mixed_collision_lists_clusters_and_errors() {
        let mut b = vec![0u8; 300];
        b[99] = 1;
        let fs = MemoryFs::new()
            .with_file("a.txt", vec![0; 300])
            .with_file("b.txt", b)
            .with_file("c.txt", vec![0; 300])
            .with_file("e.txt", vec![0; 5]);
        let records = [
            ManifestRecord::new("beef", "a.txt"),
            ManifestRecord::new("beef", "b.txt"),
            ManifestRecord::new("beef", "c.txt"),
            ManifestRecord::new("beef", "d.txt"),
            ManifestRecord::new("beef", "e.txt"),
        ];
        let text = render(&analyze(fs, &records));

        assert!(text.contains("beef  mixed collision"));
        assert!(text.contains("identical: a.txt, c.txt"));
        assert!(text.contains("distinct:  b.txt"));
        assert!(text.contains("unreadable: cannot stat d.txt"));
        assert!(text.contains("1 unreadable file(s), 0 content error(s)"));
    }

    #[test]
    fn test_budget_exhaustion_is_reported() {
        let fs = MemoryFs::new()
            .with_file("a", vec![1; 4])
            .with_file("b", vec![1; 4])
            .with_file("c", vec![2; 4])
            .with_file("d", vec![2; 4]);
        let records = [
            ManifestRecord::new("m", "a"),
            ManifestRecord::new("m", "b"),
            ManifestRecord::new("n", "c"),
            ManifestRecord::new("n", "d"),
        ];
        let config = FinderConfig::default()
            .with_io_threads(1)
            .with_max_bytes_read(Some(1));
        let report = CollisionFinder::new(config, fs).analyze(&records).unwrap();
        let text = render(&report);

        assert!(text.contains("skipped: c"));
        assert!(text.contains("Analysis read budget exhausted; 2 file(s) skipped"));
    }
}
