//! Zip archive of batch outputs

use crate::error::{Error, JobFailure, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::write::FileOptions;

/// Entry name of the failure list added under the partial-success policy
pub const FAILURE_MANIFEST_NAME: &str = "conversion-failures.txt";

/// One file to add to an archive
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Name inside the archive
    pub name: String,
    /// File on disk holding the entry's bytes
    pub source: PathBuf,
}

/// Write `entries` (in order) and an optional text manifest into a zip at `dest`
///
/// Entries are stored without recompression and copied from disk, so no
/// output is ever held in memory. Returns the archive size in bytes.
pub fn write_archive(
    dest: &Path,
    entries: &[ArchiveEntry],
    manifest: Option<&str>,
) -> Result<u64> {
    let file = File::create(dest)?;
    let mut zip = zip::ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);

    for entry in entries {
        zip.start_file(entry.name.as_str(), options)?;
        let mut source = File::open(&entry.source).map_err(|e| {
            Error::Archive(format!(
                "failed to open {} for '{}': {}",
                entry.source.display(),
                entry.name,
                e
            ))
        })?;
        std::io::copy(&mut source, &mut zip)?;
    }

    if let Some(manifest) = manifest {
        zip.start_file(FAILURE_MANIFEST_NAME, options)?;
        zip.write_all(manifest.as_bytes())?;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    drop(writer);

    Ok(std::fs::metadata(dest)?.len())
}

/// [`write_archive`] on the blocking thread pool
pub async fn build_archive(
    dest: PathBuf,
    entries: Vec<ArchiveEntry>,
    manifest: Option<String>,
) -> Result<u64> {
    tokio::task::spawn_blocking(move || write_archive(&dest, &entries, manifest.as_deref()))
        .await
        .map_err(|e| Error::Archive(format!("archive task failed: {e}")))?
}

/// One `<original name>: <reason>` line per failed job
pub fn failure_manifest(failures: &[JobFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("{failure}\n"))
        .collect()
}
