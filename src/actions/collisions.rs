//! Collision analysis of a manifest directory.

use std::path::Path;

use crate::collisions::{CollisionFinder, CollisionReport, FinderConfig, FinderError, LocalFs};
use crate::error::ExitCode;
use crate::manifest::ManifestRecord;

/// Analyse `records` against the files in `dir`.
///
/// # Errors
///
/// Returns [`FinderError::Interrupted`] if shutdown was already requested.
pub fn find_collisions(
    dir: &Path,
    records: &[ManifestRecord],
    config: FinderConfig,
) -> Result<CollisionReport, FinderError> {
    CollisionFinder::new(config, LocalFs::rooted(dir)).analyze(records)
}

/// Exit code for a finished report.
///
/// Interruption wins over per-file errors; a report with unreadable files,
/// content errors or files left out by the byte budget is a partial success.
#[must_use]
pub fn report_exit_code(report: &CollisionReport) -> ExitCode {
    if report.summary.interrupted {
        ExitCode::Interrupted
    } else if report.summary.has_errors() || report.summary.budget_exhausted {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    }
}
