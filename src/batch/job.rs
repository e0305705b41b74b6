//! Single conversion unit

use crate::encoder::Encoder;
use crate::error::{EncodeError, JobFailure};
use crate::options::EncodeOptions;
use crate::types::{Job, JobStatus};
use std::time::Duration;
use tracing::{debug, warn};

/// Run the encoder for one job and record the outcome on it
///
/// The job succeeds only if the encoder reports success within `deadline` and
/// the planned output path then holds a non-empty file. Dropping the encode
/// future at the deadline stops the encoder. Never deletes files, never
/// retries.
pub async fn run_job(
    encoder: &dyn Encoder,
    job: &mut Job,
    options: &EncodeOptions,
    deadline: Option<Duration>,
) {
    job.status = JobStatus::Running;
    debug!(job_id = %job.id, file = %job.original_name, "starting conversion");

    let encode = encoder.encode(&job.input_path, &job.output_path, options);
    let result = match deadline {
        Some(limit) => match tokio::time::timeout(limit, encode).await {
            Ok(result) => result,
            Err(_) => Err(EncodeError::TimedOut(limit)),
        },
        None => encode.await,
    };

    let result = match result {
        Ok(_) => verify_output(job).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(size_bytes) => {
            debug!(
                job_id = %job.id,
                file = %job.original_name,
                size_bytes,
                "conversion succeeded"
            );
            job.status = JobStatus::Succeeded;
        }
        Err(error) => {
            warn!(
                job_id = %job.id,
                file = %job.original_name,
                error = %error,
                "conversion failed"
            );
            job.status = JobStatus::Failed;
            job.failure = Some(JobFailure {
                job_id: job.id,
                original_name: job.original_name.clone(),
                error,
            });
        }
    }
}

async fn verify_output(job: &Job) -> Result<u64, EncodeError> {
    let invalid = |reason: String| EncodeError::InvalidOutput {
        path: job.output_path.clone(),
        reason,
    };

    let metadata = tokio::fs::metadata(&job.output_path)
        .await
        .map_err(|e| invalid(format!("output missing: {e}")))?;

    if !metadata.is_file() || metadata.len() == 0 {
        return Err(invalid("output is empty".to_string()));
    }

    Ok(metadata.len())
}
