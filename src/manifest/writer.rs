//! Manifest serialization.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::ManifestRecord;

/// Writes records as manifest lines.
pub struct ManifestWriter<W: Write> {
    inner: W,
    written: usize,
}

impl<W: Write> ManifestWriter<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Write one record followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub fn write_record(&mut self, record: &ManifestRecord) -> io::Result<()> {
        writeln!(self.inner, "{record}")?;
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the inner writer.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if flushing fails.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Write all `records` to `writer`, in order.
///
/// # Errors
///
/// Returns the first I/O error encountered.
pub fn write_manifest<'a, W: Write>(
    writer: W,
    records: impl IntoIterator<Item = &'a ManifestRecord>,
) -> io::Result<W> {
    let mut writer = ManifestWriter::new(writer);
    for record in records {
        writer.write_record(record)?;
    }
    writer.finish()
}

/// Write a manifest file at `path`.
///
/// Refuses to replace an existing file unless `overwrite` is set.
///
/// # Errors
///
/// Returns an [`io::ErrorKind::AlreadyExists`] error when the file exists
/// and `overwrite` is false, or any I/O error from writing.
pub fn save_manifest(path: &Path, records: &[ManifestRecord], overwrite: bool) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let file = options.open(path)?;
    write_manifest(BufWriter::new(file), records)?;
    log::debug!("Wrote {} record(s) to {}", records.len(), path.display());
    Ok(())
}
