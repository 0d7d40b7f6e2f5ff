//! Manifest generation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::hashing::{HashAlgorithm, HashError, Hasher};
use crate::manifest::{save_manifest, ManifestRecord};
use crate::progress::ProgressCallback;
use crate::scanner::{list_files, ScanError};

/// Errors that abort `generate`.
#[derive(thiserror::Error, Debug)]
pub enum GenerateError {
    /// The manifest exists and overwriting was not requested.
    #[error("{0} already exists")]
    AlreadyExists(PathBuf),

    /// The directory could not be listed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A file could not be hashed.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// The manifest could not be written.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Manifest path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Settings for one `generate` run.
#[derive(Clone)]
pub struct GenerateOptions {
    /// Algorithm to hash with
    pub algorithm: HashAlgorithm,
    /// Replace an existing manifest
    pub overwrite: bool,
    /// Files hashed in parallel
    pub io_threads: usize,
    /// Optional progress callback
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for GenerateOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerateOptions")
            .field("algorithm", &self.algorithm)
            .field("overwrite", &self.overwrite)
            .field("io_threads", &self.io_threads)
            .finish_non_exhaustive()
    }
}

impl GenerateOptions {
    /// Options for `algorithm` with defaults for the rest.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            overwrite: false,
            io_threads: 4,
            progress_callback: None,
        }
    }

    /// Allow replacing an existing manifest.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the number of hashing threads (at least one).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }
}

/// What `generate` wrote.
#[derive(Debug)]
pub struct GenerateSummary {
    /// Manifest path
    pub path: PathBuf,
    /// Records written, in listing order
    pub records: Vec<ManifestRecord>,
}

/// Hash `names` inside `dir` on a pool of `threads` workers, keeping order.
pub(crate) fn hash_files(
    dir: &Path,
    names: &[String],
    algorithm: &HashAlgorithm,
    hasher: &Hasher,
    threads: usize,
    progress: Option<&Arc<dyn ProgressCallback>>,
) -> Vec<Result<String, HashError>> {
    if let Some(callback) = progress {
        callback.on_phase_start("hashing", names.len());
    }
    let done = AtomicUsize::new(0);

    let hash_one = |name: &String| {
        let result = hasher.digest(&dir.join(name), algorithm);
        if let Some(callback) = progress {
            callback.on_progress(done.fetch_add(1, Ordering::Relaxed) + 1, name);
        }
        result
    };

    let results = match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(|| names.par_iter().map(hash_one).collect()),
        Err(e) => {
            log::warn!("Failed to create thread pool ({}), hashing sequentially", e);
            names.iter().map(hash_one).collect()
        }
    };

    if let Some(callback) = progress {
        callback.on_phase_end("hashing");
    }
    results
}

/// Write a manifest for every listed file in `dir`.
///
/// Refuses to run when the manifest already exists unless overwriting was
/// requested. Any file that cannot be hashed aborts the run before the
/// manifest is touched.
///
/// # Errors
///
/// See [`GenerateError`].
pub fn generate(
    dir: &Path,
    options: &GenerateOptions,
    hasher: &Hasher,
) -> Result<GenerateSummary, GenerateError> {
    let path = dir.join(options.algorithm.manifest_filename()?);
    if !options.overwrite && path.exists() {
        return Err(GenerateError::AlreadyExists(path));
    }

    let names = list_files(dir)?;
    log::info!("Hashing {} file(s) with {}", names.len(), options.algorithm);

    let digests = hash_files(
        dir,
        &names,
        &options.algorithm,
        hasher,
        options.io_threads,
        options.progress_callback.as_ref(),
    );

    let mut records = Vec::with_capacity(names.len());
    for (name, digest) in names.into_iter().zip(digests) {
        records.push(ManifestRecord::new(digest?, name));
    }

    save_manifest(&path, &records, options.overwrite).map_err(|source| {
        if source.kind() == std::io::ErrorKind::AlreadyExists {
            GenerateError::AlreadyExists(path.clone())
        } else {
            GenerateError::Write {
                path: path.clone(),
                source,
            }
        }
    })?;

    Ok(GenerateSummary { path, records })
}
