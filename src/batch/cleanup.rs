//! Best-effort removal of batch artifacts

use super::workspace::Workspace;
use std::io::ErrorKind;
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Outcome counters of one cleanup run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Artifacts deleted
    pub removed: usize,
    /// Artifacts that were already gone
    pub missing: usize,
    /// Artifacts that could not be deleted
    pub failed: usize,
}

/// Owner and sole deleter of a batch's temp artifacts
///
/// Every input, output and archive path of the batch is tracked here. The
/// manager runs at most once: either explicitly through [`run`](Self::run) or,
/// if it is dropped without running, synchronously in `Drop`. Errors are
/// logged and counted, never returned.
#[derive(Debug)]
pub struct CleanupManager {
    batch_id: String,
    paths: Vec<PathBuf>,
    workspace: Option<TempDir>,
}

impl CleanupManager {
    /// Take ownership of a workspace
    pub fn new(workspace: Workspace) -> Self {
        Self {
            batch_id: workspace.id().to_string(),
            paths: Vec::new(),
            workspace: Some(workspace.into_temp_dir()),
        }
    }

    /// Batch id used in log fields
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Track a path created or attempted by the batch
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    /// Paths that will be deleted
    pub fn tracked(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Delete every tracked path, then the workspace directory
    pub async fn run(mut self) -> CleanupReport {
        let mut report = CleanupReport::default();

        for path in std::mem::take(&mut self.paths) {
            let result = tokio::fs::remove_file(&path).await;
            record(&self.batch_id, &path, result, &mut report);
        }

        if let Some(dir) = self.workspace.take() {
            let batch_id = self.batch_id.clone();
            let path = dir.path().to_path_buf();
            match tokio::task::spawn_blocking(move || dir.close()).await {
                Ok(Ok(())) => debug!(batch_id = %batch_id, "removed batch workspace"),
                Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                    debug!(batch_id = %batch_id, "batch workspace already gone")
                }
                Ok(Err(e)) => {
                    warn!(batch_id = %batch_id, path = %path.display(), error = %e, "failed to remove batch workspace")
                }
                Err(e) => {
                    warn!(batch_id = %batch_id, error = %e, "workspace removal task failed")
                }
            }
        }

        debug!(
            batch_id = %self.batch_id,
            removed = report.removed,
            missing = report.missing,
            failed = report.failed,
            "batch cleanup finished"
        );

        report
    }
}

impl Drop for CleanupManager {
    fn drop(&mut self) {
        if self.paths.is_empty() && self.workspace.is_none() {
            return;
        }

        let mut report = CleanupReport::default();
        for path in std::mem::take(&mut self.paths) {
            let result = std::fs::remove_file(&path);
            record(&self.batch_id, &path, result, &mut report);
        }

        if let Some(dir) = self.workspace.take()
            && let Err(e) = dir.close()
            && e.kind() != ErrorKind::NotFound
        {
            warn!(batch_id = %self.batch_id, error = %e, "failed to remove batch workspace");
        }

        debug!(
            batch_id = %self.batch_id,
            removed = report.removed,
            missing = report.missing,
            failed = report.failed,
            "batch cleanup ran on drop"
        );
    }
}

fn record(
    batch_id: &str,
    path: &std::path::Path,
    result: std::io::Result<()>,
    report: &mut CleanupReport,
) {
    match result {
        Ok(()) => {
            debug!(batch_id, path = %path.display(), "deleted artifact");
            report.removed += 1;
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(batch_id, path = %path.display(), "artifact already gone");
            report.missing += 1;
        }
        Err(e) => {
            warn!(batch_id, path = %path.display(), error = %e, "failed to delete artifact");
            report.failed += 1;
        }
    }
}
