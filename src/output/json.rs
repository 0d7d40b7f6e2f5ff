//! JSON collision report for scripting.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "collisions": [
//!     {
//!       "checksum": "3b5d...",
//!       "kind": "mixed",
//!       "groups": [
//!         { "size": 300, "clusters": [["a.txt", "c.txt"], ["b.txt"]] }
//!       ],
//!       "unreadable": [{ "file": "d.txt", "error": "cannot stat d.txt: ..." }],
//!       "content_errors": [],
//!       "skipped": []
//!     }
//!   ],
//!   "summary": { "total_records": 5, "colliding_buckets": 1, "exit_code": 3, ... }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::collisions::{BucketAnalysis, CollisionKind, CollisionReport, CollisionSummary};
use crate::error::ExitCode;

/// Clusters of one file size.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSizeGroup {
    /// Shared size in bytes
    pub size: u64,
    /// Content clusters, each a list of filenames
    pub clusters: Vec<Vec<String>>,
}

/// A file that could not be analysed.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFileError {
    /// Manifest filename
    pub file: String,
    /// Error message
    pub error: String,
}

/// One shared checksum.
#[derive(Debug, Clone, Serialize)]
pub struct JsonCollision {
    /// The shared checksum
    pub checksum: String,
    /// Plain or mixed
    pub kind: CollisionKind,
    /// Clusters by size
    pub groups: Vec<JsonSizeGroup>,
    /// Files whose metadata could not be read
    pub unreadable: Vec<JsonFileError>,
    /// Files whose content could not be compared
    pub content_errors: Vec<JsonFileError>,
    /// Files left out because analysis stopped early
    pub skipped: Vec<String>,
}

impl JsonCollision {
    /// Convert one bucket analysis.
    #[must_use]
    pub fn from_analysis(analysis: &BucketAnalysis) -> Self {
        Self {
            checksum: analysis.checksum.clone(),
            kind: analysis.kind,
            groups: analysis
                .clusters
                .iter()
                .map(|sc| JsonSizeGroup {
                    size: sc.size,
                    clusters: sc.clusters.iter().map(|c| c.files().to_vec()).collect(),
                })
                .collect(),
            unreadable: analysis
                .size_groups
                .unreadable
                .iter()
                .map(|e| JsonFileError {
                    file: e.filename.clone(),
                    error: e.to_string(),
                })
                .collect(),
            content_errors: analysis
                .content_errors
                .iter()
                .map(|u| JsonFileError {
                    file: u.filename.clone(),
                    error: u.error.to_string(),
                })
                .collect(),
            skipped: analysis.skipped.clone(),
        }
    }
}

/// Summary with the run's exit code.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Analysis counters
    #[serde(flatten)]
    pub counts: CollisionSummary,
    /// Duration of the analysis in milliseconds
    pub duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "RS000")
    pub exit_code_name: String,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Shared checksums sorted by checksum
    pub collisions: Vec<JsonCollision>,
    /// Summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the JSON view of a report.
    #[must_use]
    pub fn new(report: &CollisionReport, exit_code: ExitCode) -> Self {
        Self {
            collisions: report.buckets.iter().map(JsonCollision::from_analysis).collect(),
            summary: JsonSummary {
                counts: report.summary.clone(),
                duration_ms: report.summary.duration.as_millis() as u64,
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Write the report as JSON, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        if pretty {
            serde_json::to_writer_pretty(&mut *writer, self)?;
        } else {
            serde_json::to_writer(&mut *writer, self)?;
        }
        writeln!(writer)?;
        Ok(())
    }
}

/// Failure to emit the JSON report.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// The report could not be encoded or written.
    #[error("Failed to write JSON report: {0}")]
    Encode(#[from] serde_json::Error),

    /// The trailing newline could not be written.
    #[error("Failed to write JSON report: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collisions::testutil::MemoryFs;
    use crate::collisions::{CollisionFinder, FinderConfig};
    use crate::manifest::ManifestRecord;

    fn sample_report() -> CollisionReport {
        let fs = MemoryFs::new()
            .with_file("a", vec![1; 8])
            .with_file("b", vec![1; 8])
            .with_file("c", vec![2; 8]);
        let records = [
            ManifestRecord::new("ff", "a"),
            ManifestRecord::new("ff", "b"),
            ManifestRecord::new("ff", "c"),
            ManifestRecord::new("ff", "gone"),
            ManifestRecord::new("00", "solo"),
        ];
        CollisionFinder::new(FinderConfig::default(), fs)
            .analyze(&records)
            .unwrap()
    }

    #[test]
    fn test_json_output_structure() {
        let output = JsonOutput::new(&sample_report(), ExitCode::PartialSuccess);

        assert_eq!(output.collisions.len(), 1);
        let collision = &output.collisions[0];
        assert_eq!(collision.checksum, "ff");
        assert_eq!(collision.kind, CollisionKind::Mixed);
        assert_eq!(
            collision.groups[0].clusters,
            vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]]
        );
        assert_eq!(collision.unreadable.len(), 1);
        assert_eq!(collision.unreadable[0].file, "gone");
        assert_eq!(output.summary.exit_code, 3);
    }

    #[test]
    fn test_json_is_valid() {
        let output = JsonOutput::new(&sample_report(), ExitCode::PartialSuccess);
        let mut buf = Vec::new();
        output.write_to(&mut buf, false).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(value["collisions"][0]["kind"], "mixed");
        assert_eq!(value["summary"]["total_records"], 5);
        assert_eq!(value["summary"]["exit_code_name"], "RS003");
        assert!(value["summary"].get("duration").is_none());
    }

    #[test]
    fn test_write_to_pretty() {
        let output = JsonOutput::new(&CollisionReport::default(), ExitCode::Success);
        let mut buf = Vec::new();
        output.write_to(&mut buf, true).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains('\n'));
        assert!(text.ends_with("}\n"));
    }
}
