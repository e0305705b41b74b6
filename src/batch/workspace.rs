//! Per-request scoped working directories

use crate::error::Result;
use crate::types::JobId;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Name prefix of every batch workspace inside the work directory
pub const WORKSPACE_PREFIX: &str = "batch-";

/// A private directory holding every artifact of one request
///
/// Artifacts are named by position and job id only, never by anything the
/// client sent. Dropping the workspace removes the directory and its contents.
#[derive(Debug)]
pub struct Workspace {
    id: String,
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace inside `work_dir`, creating `work_dir` if needed
    pub fn create(work_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(work_dir)?;

        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(work_dir)?;
        let id = dir
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        debug!(batch_id = %id, path = %dir.path().display(), "created batch workspace");

        Ok(Self { id, dir })
    }

    /// Directory name, used as the batch id in logs
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Workspace directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the upload at `index` is staged
    pub fn input_path(&self, index: usize) -> PathBuf {
        self.dir.path().join(format!("{index}-input"))
    }

    /// Where the output of job `id` is written
    pub fn output_path(&self, id: JobId) -> PathBuf {
        self.dir.path().join(format!("{id}-output.webp"))
    }

    /// Where a multi-file archive is built
    pub fn archive_path(&self) -> PathBuf {
        self.dir.path().join("archive.zip")
    }

    pub(crate) fn into_temp_dir(self) -> TempDir {
        self.dir
    }
}

/// Create `work_dir` and remove workspaces left behind by a previous run
///
/// Returns the number of stale workspaces removed. Failures to remove a single
/// workspace are logged and skipped.
pub async fn prepare_work_dir(work_dir: &Path) -> Result<usize> {
    tokio::fs::create_dir_all(work_dir).await?;

    let mut entries = tokio::fs::read_dir(work_dir).await?;
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(WORKSPACE_PREFIX) {
            continue;
        }

        let path = entry.path();
        let is_dir = entry
            .file_type()
            .await
            .map(|file_type| file_type.is_dir())
            .unwrap_or(false);
        if !is_dir {
            continue;
        }

        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "removed stale batch workspace");
                removed += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove stale batch workspace");
            }
        }
    }

    if removed > 0 {
        info!(
            removed,
            work_dir = %work_dir.display(),
            "swept stale batch workspaces"
        );
    }

    Ok(removed)
}
