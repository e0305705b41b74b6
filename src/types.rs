//! Core types for webp-convert

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

use crate::config::FailurePolicy;
use crate::error::JobFailure;
use crate::options::EncodeOptions;

/// Identifier of a job, unique within its batch
///
/// Jobs are numbered in upload order, starting at zero. The id also names the
/// job's artifacts inside the batch workspace, so two uploads can never share a
/// storage path even when the client sent identical filenames.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct JobId(pub usize);

impl JobId {
    /// Get the inner index
    pub fn get(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a single job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Planned, encoder not started yet
    Pending,
    /// Encoder running
    Running,
    /// Output artifact produced
    Succeeded,
    /// Encoder failed; see the job's failure
    Failed,
}

/// An uploaded file that has been written into the batch workspace
#[derive(Clone, Debug)]
pub struct StagedUpload {
    /// Filename as sent by the client
    pub original_name: String,
    /// Where the payload was written
    pub path: PathBuf,
}

/// Everything the orchestrator needs to run one batch
#[derive(Clone, Debug)]
pub struct BatchRequest {
    /// Uploads in the order they arrived
    pub uploads: Vec<StagedUpload>,
    /// Encoder settings shared by every job
    pub options: EncodeOptions,
    /// Client-requested output name (honored for single-file batches only)
    pub desired_name: Option<String>,
}

/// One conversion unit: one input, one output, one encoder invocation
#[derive(Debug)]
pub struct Job {
    /// Position of the upload in the request
    pub id: JobId,
    /// Filename as sent by the client
    pub original_name: String,
    /// Staged input artifact
    pub input_path: PathBuf,
    /// Planned output artifact
    pub output_path: PathBuf,
    /// Filename presented to the client
    pub display_name: String,
    /// Current state
    pub status: JobStatus,
    /// Set once the job has failed
    pub failure: Option<JobFailure>,
}

impl Job {
    /// Whether the job produced its output
    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}

/// Settled jobs of a batch, in upload order
#[derive(Debug)]
pub struct BatchResult {
    /// Every job of the batch
    pub jobs: Vec<Job>,
}

impl BatchResult {
    /// Number of jobs in the batch
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the batch has no jobs
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// True only if every job succeeded
    pub fn all_succeeded(&self) -> bool {
        self.jobs.iter().all(Job::succeeded)
    }

    /// Jobs that produced an output
    pub fn succeeded(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(|job| job.succeeded())
    }
}

/// What the server can do, reported by `GET /capabilities`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Capabilities {
    /// Name of the encoder implementation in use
    pub encoder: String,
    /// Whether conversions can run at all
    pub encoder_available: bool,
    /// Maximum number of files per request
    pub max_files: usize,
    /// What happens to a batch when some of its jobs fail
    pub failure_policy: FailurePolicy,
    /// Download name of multi-file archives
    pub archive_name: String,
}
