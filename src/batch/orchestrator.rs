//! Fan-out of conversion jobs and selection of the response artifact

use super::archive::{ArchiveEntry, build_archive, failure_manifest};
use super::cleanup::CleanupManager;
use super::job::run_job;
use super::workspace::Workspace;
use crate::config::{BatchConfig, Config, FailurePolicy};
use crate::encoder::Encoder;
use crate::error::{Error, JobFailure, Result, ValidationError};
use crate::naming::{dedupe_entry_names, resolve_display_name};
use crate::types::{BatchRequest, BatchResult, Capabilities, Job, JobId, JobStatus};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// What the batch hands to the response
#[derive(Debug)]
pub enum OutputKind {
    /// The single output of a one-file batch
    Single,
    /// A zip archive of several outputs
    Archive {
        /// Entry names, in upload order
        entries: Vec<String>,
    },
}

/// A finished artifact ready to stream, plus the cleanup that must follow
#[derive(Debug)]
pub struct BatchOutput {
    /// File to stream
    pub path: PathBuf,
    /// Download filename
    pub file_name: String,
    /// Single file or archive
    pub kind: OutputKind,
    /// Jobs left out of the archive (partial-success policy only)
    pub failures: Vec<JobFailure>,
    /// Deletes every artifact of the batch once the response is done
    pub cleanup: CleanupManager,
}

impl BatchOutput {
    /// MIME type of the artifact
    pub fn content_type(&self) -> &'static str {
        match self.kind {
            OutputKind::Single => "image/webp",
            OutputKind::Archive { .. } => "application/zip",
        }
    }
}

/// Runs batches against one encoder
pub struct BatchOrchestrator {
    encoder: Arc<dyn Encoder>,
    config: BatchConfig,
    deadline: Option<Duration>,
}

impl BatchOrchestrator {
    /// Create an orchestrator
    pub fn new(encoder: Arc<dyn Encoder>, config: BatchConfig, deadline: Option<Duration>) -> Self {
        Self {
            encoder,
            config,
            deadline,
        }
    }

    /// Create an orchestrator from the service configuration
    pub fn from_config(encoder: Arc<dyn Encoder>, config: &Config) -> Self {
        Self::new(encoder, config.batch.clone(), config.encoder.timeout())
    }

    /// Encoder in use
    pub fn encoder(&self) -> &Arc<dyn Encoder> {
        &self.encoder
    }

    /// Batch settings
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// What this orchestrator can do, for `GET /capabilities`
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            encoder: self.encoder.name().to_string(),
            encoder_available: self.encoder.is_available(),
            max_files: self.config.max_files,
            failure_policy: self.config.failure_policy,
            archive_name: self.config.archive_name.clone(),
        }
    }

    /// Create a workspace for a new request
    pub fn create_workspace(&self) -> Result<Workspace> {
        Workspace::create(&self.config.work_dir)
    }

    /// Run every job of the batch and settle on a response artifact
    ///
    /// On `Ok`, the returned [`BatchOutput`] owns the cleanup and runs it when
    /// dropped or explicitly run. On `Err`, every artifact has already been
    /// deleted.
    pub async fn run(&self, workspace: Workspace, request: BatchRequest) -> Result<BatchOutput> {
        let batch_id = workspace.id().to_string();
        let total = request.uploads.len();
        let mut jobs = plan_jobs(&workspace, &request);
        let archive_path = workspace.archive_path();

        let mut cleanup = CleanupManager::new(workspace);
        for upload in &request.uploads {
            cleanup.track(&upload.path);
        }

        if total == 0 {
            cleanup.run().await;
            return Err(ValidationError::NoFiles.into());
        }
        if total > self.config.max_files {
            cleanup.run().await;
            return Err(ValidationError::TooManyFiles {
                max: self.config.max_files,
            }
            .into());
        }

        for job in &jobs {
            cleanup.track(&job.output_path);
        }

        info!(batch_id = %batch_id, files = total, "starting batch");
        self.run_jobs(&mut jobs, &request).await;
        let result = BatchResult { jobs };

        match self.settle(result, archive_path, &mut cleanup).await {
            Ok((path, file_name, kind, failures)) => {
                info!(
                    batch_id = %batch_id,
                    file_name = %file_name,
                    failed = failures.len(),
                    "batch ready"
                );
                Ok(BatchOutput {
                    path,
                    file_name,
                    kind,
                    failures,
                    cleanup,
                })
            }
            Err(e) => {
                warn!(batch_id = %batch_id, error = %e, "batch failed");
                cleanup.run().await;
                Err(e)
            }
        }
    }

    async fn run_jobs(&self, jobs: &mut [Job], request: &BatchRequest) {
        let limit = self.config.max_concurrent_jobs.filter(|n| *n < jobs.len());
        let semaphore = limit.map(Semaphore::new);
        let encoder = self.encoder.as_ref();
        let options = &request.options;
        let deadline = self.deadline;

        let runs = jobs.iter_mut().map(|job| {
            let semaphore = semaphore.as_ref();
            async move {
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire().await.ok(),
                    None => None,
                };
                run_job(encoder, job, options, deadline).await;
            }
        });

        futures::future::join_all(runs).await;
    }

    async fn settle(
        &self,
        result: BatchResult,
        archive_path: PathBuf,
        cleanup: &mut CleanupManager,
    ) -> Result<(PathBuf, String, OutputKind, Vec<JobFailure>)> {
        let total = result.len();
        let all_succeeded = result.all_succeeded();
        let any_succeeded = result.succeeded().next().is_some();
        let partial_allowed =
            self.config.failure_policy == FailurePolicy::Partial && total > 1 && any_succeeded;

        let mut succeeded = Vec::new();
        let mut failures = Vec::new();
        for job in result.jobs {
            match (job.status, job.failure) {
                (JobStatus::Succeeded, _) => succeeded.push((job.display_name, job.output_path)),
                (_, Some(failure)) => failures.push(failure),
                (status, None) => {
                    return Err(Error::Other(format!(
                        "job {} settled in unexpected state {:?}",
                        job.id, status
                    )));
                }
            }
        }

        if !all_succeeded && !partial_allowed {
            return Err(Error::Conversion { failures, total });
        }

        if total == 1 {
            if let Some((file_name, path)) = succeeded.pop() {
                return Ok((path, file_name, OutputKind::Single, failures));
            }
            return Err(Error::Conversion { failures, total });
        }

        let names = dedupe_entry_names(succeeded.iter().map(|(name, _)| name));
        let entries: Vec<ArchiveEntry> = names
            .iter()
            .zip(succeeded)
            .map(|(name, (_, source))| ArchiveEntry {
                name: name.clone(),
                source,
            })
            .collect();
        let manifest = (!failures.is_empty()).then(|| failure_manifest(&failures));

        cleanup.track(&archive_path);

        build_archive(archive_path.clone(), entries, manifest).await?;

        Ok((
            archive_path,
            self.config.archive_name.clone(),
            OutputKind::Archive { entries: names },
            failures,
        ))
    }
}

/// One job per staged upload, in upload order
fn plan_jobs(workspace: &Workspace, request: &BatchRequest) -> Vec<Job> {
    let batch_size = request.uploads.len();

    request
        .uploads
        .iter()
        .enumerate()
        .map(|(index, upload)| {
            let id = JobId(index);
            Job {
                id,
                original_name: upload.original_name.clone(),
                input_path: upload.path.clone(),
                output_path: workspace.output_path(id),
                display_name: resolve_display_name(
                    &upload.original_name,
                    request.desired_name.as_deref(),
                    batch_size,
                ),
                status: JobStatus::Pending,
                failure: None,
            }
        })
        .collect()
}
