//! Verification of files against a manifest.

use std::path::Path;
use std::sync::Arc;

use super::generate::hash_files;
use crate::hashing::{HashAlgorithm, HashError, Hasher};
use crate::manifest::ManifestRecord;
use crate::progress::ProgressCallback;

/// A record that did not verify.
#[derive(Debug)]
pub enum VerifyFailure {
    /// The file's digest differs from the manifest.
    Mismatch {
        /// Manifest filename
        filename: String,
        /// Checksum recorded in the manifest
        expected: String,
        /// Checksum computed now
        actual: String,
    },
    /// The file could not be hashed.
    Unreadable {
        /// Manifest filename
        filename: String,
        /// Why hashing failed
        error: HashError,
    },
}

impl std::fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mismatch {
                filename, expected, ..
            } => write!(f, "{filename} does not match {expected}"),
            Self::Unreadable { error, .. } => write!(f, "{error}"),
        }
    }
}

/// Result of verifying a manifest.
#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Records checked
    pub checked: usize,
    /// Failures in manifest order
    pub failures: Vec<VerifyFailure>,
}

impl VerifyReport {
    /// Check whether every record matched.
    #[must_use]
    pub fn all_match(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of mismatching files.
    #[must_use]
    pub fn mismatches(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| matches!(f, VerifyFailure::Mismatch { .. }))
            .count()
    }
}

/// Recompute each record's digest and compare it with the manifest.
///
/// Checksums are compared case-insensitively. Filenames are resolved
/// against `dir`.
///
/// # Errors
///
/// Returns [`HashError::Interrupted`] if shutdown was requested, and an
/// algorithm error if `algorithm` is unsupported. Per-file failures are
/// collected in the report.
pub fn verify(
    dir: &Path,
    records: &[ManifestRecord],
    algorithm: &HashAlgorithm,
    hasher: &Hasher,
    io_threads: usize,
    progress: Option<&Arc<dyn ProgressCallback>>,
) -> Result<VerifyReport, HashError> {
    algorithm.ensure_supported()?;
    let names: Vec<String> = records.iter().map(|r| r.filename.clone()).collect();
    let digests = hash_files(dir, &names, algorithm, hasher, io_threads.max(1), progress);

    let mut report = VerifyReport {
        checked: records.len(),
        failures: Vec::new(),
    };

    for (record, digest) in records.iter().zip(digests) {
        match digest {
            Ok(actual) if actual.eq_ignore_ascii_case(&record.checksum) => {}
            Ok(actual) => report.failures.push(VerifyFailure::Mismatch {
                filename: record.filename.clone(),
                expected: record.checksum.clone(),
                actual,
            }),
            Err(HashError::Interrupted) => return Err(HashError::Interrupted),
            Err(error) => report.failures.push(VerifyFailure::Unreadable {
                filename: record.filename.clone(),
                error,
            }),
        }
    }

    log::info!(
        "Verified {} record(s), {} failure(s)",
        report.checked,
        report.failures.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ABC_MD5: &str = "900150983cd24fb0d6963f7d28e17f72";

    #[test]
    fn test_verify_all_match() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a"), "abc").unwrap();
        let records = vec![ManifestRecord::new(ABC_MD5, "a")];

        let report = verify(
            dir.path(),
            &records,
            &HashAlgorithm::Md5,
            &Hasher::new(),
            2,
            None,
        )
        .unwrap();
        assert!(report.all_match());
        assert_eq!(report.checked, 1);
    }

    #[test]
    fn test_verify_uppercase_checksum_matches() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a"), "abc").unwrap();
        let records = vec![ManifestRecord::new(ABC_MD5.to_uppercase(), "a")];

        let report =
            verify(dir.path(), &records, &HashAlgorithm::Md5, &Hasher::new(), 1, None).unwrap();
        assert!(report.all_match());
    }

    #[test]
    fn test_verify_reports_mismatch_and_missing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a"), "changed").unwrap();
        let records = vec![
            ManifestRecord::new(ABC_MD5, "a"),
            ManifestRecord::new(ABC_MD5, "gone"),
        ];

        let report =
            verify(dir.path(), &records, &HashAlgorithm::Md5, &Hasher::new(), 2, None).unwrap();

        assert!(!report.all_match());
        assert_eq!(report.mismatches(), 1);
        assert_eq!(report.failures[0].to_string(), format!("a does not match {ABC_MD5}"));
        assert!(matches!(
            report.failures[1],
            VerifyFailure::Unreadable {
                error: HashError::NotFound(_),
                ..
            }
        ));
    }

    #[test]
    fn test_verify_interrupted() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a"), "abc").unwrap();
        let records = vec![ManifestRecord::new(ABC_MD5, "a")];
        let flag = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let hasher = Hasher::new().with_shutdown_flag(flag);

        assert!(matches!(
            verify(dir.path(), &records, &HashAlgorithm::Md5, &hasher, 1, None),
            Err(HashError::Interrupted)
        ));
    }
}
