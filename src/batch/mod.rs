//! Batch conversion
//!
//! A batch is one request's worth of uploads. The [`BatchOrchestrator`] plans
//! one job per upload inside a private [`Workspace`], runs every job
//! concurrently, and settles on a single response artifact: the one output,
//! or a zip archive of all outputs. The [`CleanupManager`] owns every artifact
//! from then on and deletes them once the response is finished or abandoned,
//! or immediately when the batch fails.

mod archive;
mod cleanup;
mod job;
mod orchestrator;
mod workspace;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod test_helpers;

pub use archive::{ArchiveEntry, FAILURE_MANIFEST_NAME, build_archive, failure_manifest, write_archive};
pub use cleanup::{CleanupManager, CleanupReport};
pub use job::run_job;
pub use orchestrator::{BatchOrchestrator, BatchOutput, OutputKind};
pub use workspace::{WORKSPACE_PREFIX, Workspace, prepare_work_dir};
