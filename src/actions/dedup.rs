//! Removal of byte-identical duplicates.
//!
//! For every content cluster with more than one member the user picks the
//! file to keep; the others are deleted, moved to the trash, or, in dry-run
//! mode, only listed. A failed removal is reported and the run goes on.

use std::collections::HashSet;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::prompt::{ask_keep, PromptOutcome};
use crate::collisions::ContentCluster;

/// Error type for a single removal.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed {
        /// File that could not be trashed
        path: PathBuf,
        /// Message from the trash backend
        message: String,
    },

    /// Any other I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// File that could not be removed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// How duplicates are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalMode {
    /// Delete permanently.
    #[default]
    Delete,
    /// Move to the system trash.
    Trash,
    /// Only print what would be removed.
    DryRun,
}

/// Options for a dedup run.
#[derive(Debug, Clone)]
pub struct DedupOptions {
    /// Removal mode
    pub mode: RemovalMode,
    /// Answers accepted per prompt before the cluster is skipped
    pub max_attempts: u32,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            mode: RemovalMode::Delete,
            max_attempts: 3,
        }
    }
}

impl DedupOptions {
    /// Set the removal mode.
    #[must_use]
    pub fn with_mode(mut self, mode: RemovalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the prompt retry cap (at least one attempt).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

/// Outcome of a dedup run.
#[derive(Debug, Default)]
pub struct DedupResult {
    /// Files kept, one per handled cluster
    pub kept: Vec<String>,
    /// Files removed (or listed, in dry-run mode)
    pub removed: Vec<String>,
    /// Removals that failed
    pub failures: Vec<(String, DeleteError)>,
    /// Clusters left untouched
    pub skipped_clusters: usize,
}

impl DedupResult {
    /// Check if all removals succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary.
    #[must_use]
    pub fn summary(&self, mode: RemovalMode) -> String {
        let verb = match mode {
            RemovalMode::Delete => "Deleted",
            RemovalMode::Trash => "Trashed",
            RemovalMode::DryRun => "Would remove",
        };
        let mut summary = format!("{} {} file(s)", verb, self.removed.len());
        if !self.failures.is_empty() {
            summary.push_str(&format!(", {} failed", self.failures.len()));
        }
        if self.skipped_clusters > 0 {
            summary.push_str(&format!(", {} group(s) skipped", self.skipped_clusters));
        }
        summary
    }
}

/// Remove one file according to `mode`. Dry run does nothing.
///
/// # Errors
///
/// Returns a [`DeleteError`] describing why the file could not be removed.
pub fn remove_file(path: &Path, mode: RemovalMode) -> Result<(), DeleteError> {
    match mode {
        RemovalMode::DryRun => Ok(()),
        RemovalMode::Delete => {
            fs::remove_file(path).map_err(|e| DeleteError::from_io(path, e))?;
            log::info!("Deleted {}", path.display());
            Ok(())
        }
        RemovalMode::Trash => {
            fs::symlink_metadata(path).map_err(|e| DeleteError::from_io(path, e))?;
            trash::delete(path).map_err(|e| DeleteError::TrashFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            log::info!("Moved to trash: {}", path.display());
            Ok(())
        }
    }
}

/// Resolve a manifest filename to the file it names on disk.
///
/// Falls back to the joined path when the file cannot be canonicalized.
fn resolve(dir: &Path, file: &str) -> PathBuf {
    let path = dir.join(file);
    fs::canonicalize(&path).unwrap_or(path)
}

/// Prompt for each cluster and remove everything but the chosen file.
///
/// Filenames are resolved against `dir`. Members naming a file already kept
/// or removed in the same cluster (a repeated manifest line, `a` next to
/// `./a`) are left alone. Progress lines (`# Keeping x`, `rm y`) go to
/// `output`; when input ends, the remaining clusters are counted as skipped.
///
/// # Errors
///
/// Returns I/O errors from the prompt streams; removal failures are
/// collected in the result instead.
pub fn dedup_clusters<'a, R, W>(
    dir: &Path,
    clusters: impl IntoIterator<Item = (&'a str, &'a ContentCluster)>,
    options: &DedupOptions,
    input: &mut R,
    output: &mut W,
) -> io::Result<DedupResult>
where
    R: BufRead,
    W: Write,
{
    let mut result = DedupResult::default();
    let mut input_closed = false;

    if options.mode == RemovalMode::DryRun {
        writeln!(output, "# Dry run mode is on")?;
    }

    for (checksum, cluster) in clusters {
        if !cluster.has_duplicates() {
            continue;
        }
        if input_closed {
            result.skipped_clusters += 1;
            continue;
        }

        let files = cluster.files();
        let keep = match ask_keep(input, output, checksum, files, options.max_attempts)? {
            PromptOutcome::Keep(index) => index,
            PromptOutcome::Exhausted => {
                result.skipped_clusters += 1;
                continue;
            }
            PromptOutcome::EndOfInput => {
                log::warn!("Input closed, leaving remaining duplicates in place");
                input_closed = true;
                result.skipped_clusters += 1;
                continue;
            }
        };

        writeln!(output, "# Keeping {}", files[keep])?;
        result.kept.push(files[keep].clone());
        let targets: Vec<PathBuf> = files.iter().map(|file| resolve(dir, file)).collect();
        let mut handled = HashSet::from([&targets[keep]]);

        for (i, file) in files.iter().enumerate() {
            if i == keep {
                continue;
            }
            if !handled.insert(&targets[i]) {
                log::warn!("{} names a file already handled, leaving it in place", file);
                continue;
            }
            match remove_file(&dir.join(file), options.mode) {
                Ok(()) => {
                    let action = if options.mode == RemovalMode::Trash {
                        "trash"
                    } else {
                        "rm"
                    };
                    writeln!(output, "{action} {file}")?;
                    result.removed.push(file.clone());
                }
                Err(e) => {
                    log::error!("{}", e);
                    writeln!(output, "# failed: {e}")?;
                    result.failures.push((file.clone(), e));
                }
            }
        }
        writeln!(output)?;
    }

    Ok(result)
}
