//! Error types for webp-convert
//!
//! This module provides the error handling for the service, including:
//! - Request validation errors (no files, too many files, malformed multipart)
//! - Per-invocation encoder errors and their attribution to an uploaded file
//! - HTTP status code mapping for API integration

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::JobId;

/// Result type alias for webp-convert operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for webp-convert
///
/// Each variant carries enough context to produce a useful plain-text
/// diagnostic for the client.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "batch.max_files")
        key: Option<String>,
    },

    /// The request was rejected before any job was created
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// One or more jobs of a batch failed to convert
    #[error("{}", describe_conversion_failure(failures, *total))]
    Conversion {
        /// Every failed job, in upload order
        failures: Vec<JobFailure>,
        /// Number of jobs in the batch
        total: usize,
    },

    /// Building the output archive failed
    #[error("archive error: {0}")]
    Archive(String),

    /// Zip writer error
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Request validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The request did not contain any file part
    #[error("no file uploaded")]
    NoFiles,

    /// The request contained more file parts than allowed
    #[error("too many files: at most {max} files per request")]
    TooManyFiles {
        /// Configured maximum number of files per request
        max: usize,
    },

    /// The multipart body could not be read
    #[error("malformed multipart body: {0}")]
    Multipart(String),

    /// A text field carried data that is not valid UTF-8
    #[error("form field '{0}' is not valid UTF-8")]
    InvalidField(String),

    /// A file was sent under a field name other than the upload field
    #[error("unexpected file field '{0}'")]
    UnexpectedFile(String),

    /// The request body exceeded the configured size limit
    #[error("request body exceeds {limit} bytes")]
    TooLarge {
        /// Configured maximum body size in bytes
        limit: usize,
    },
}

/// Failure of a single encoder invocation
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The encoder process could not be started
    #[error("failed to execute {tool}: {source}")]
    Spawn {
        /// Name of the tool that failed to start
        tool: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The encoder exited with a non-zero status
    #[error("{tool} exited with {}: {}", describe_exit(*code), describe_stderr(stderr))]
    Exited {
        /// Name of the tool
        tool: String,
        /// Exit code, `None` when the process was terminated by a signal
        code: Option<i32>,
        /// Diagnostic text the tool wrote to stderr
        stderr: String,
    },

    /// The encoder did not finish within the configured deadline
    #[error("conversion timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    /// The encoder reported success but the output is missing or unusable
    #[error("invalid output at {path}: {reason}")]
    InvalidOutput {
        /// Expected output path
        path: PathBuf,
        /// Why the output was rejected
        reason: String,
    },

    /// No encoder binary is available
    #[error("encoder unavailable: {0}")]
    Unavailable(String),
}

/// An [`EncodeError`] attributed to the upload that caused it
#[derive(Debug, Error)]
#[error("{original_name}: {error}")]
pub struct JobFailure {
    /// Job that failed
    pub job_id: JobId,
    /// Filename the client uploaded
    pub original_name: String,
    /// What went wrong
    #[source]
    pub error: EncodeError,
}

fn describe_conversion_failure(failures: &[JobFailure], total: usize) -> String {
    match failures {
        [] => "conversion failed".to_string(),
        [only] if total <= 1 => format!("conversion failed for {only}"),
        [first, rest @ ..] if rest.is_empty() => {
            format!("conversion failed for 1 of {total} files: {first}")
        }
        [first, ..] => format!(
            "conversion failed for {} of {} files: {} (and {} more)",
            failures.len(),
            total,
            first,
            failures.len() - 1
        ),
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

fn describe_stderr(stderr: &str) -> &str {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        "no diagnostic output"
    } else {
        trimmed
    }
}

/// Convert errors to HTTP status codes for API responses
///
/// This trait maps domain errors to appropriate HTTP status codes.
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 413 Payload Too Large - Body over the upload limit
            Error::Validation(ValidationError::TooLarge { .. }) => 413,

            // 400 Bad Request - Client error (invalid input)
            Error::Validation(_) => 400,

            Error::Conversion { failures, .. } => {
                if !failures.is_empty()
                    && failures
                        .iter()
                        .all(|f| matches!(f.error, EncodeError::TimedOut(_)))
                {
                    // 504 Gateway Timeout - every failure was the encoder deadline
                    504
                } else if !failures.is_empty()
                    && failures
                        .iter()
                        .all(|f| matches!(f.error, EncodeError::Unavailable(_)))
                {
                    // 503 Service Unavailable - no encoder binary installed
                    503
                } else {
                    500
                }
            }

            // 500 Internal Server Error - Server-side issues
            Error::Config { .. } => 500,
            Error::Archive(_) => 500,
            Error::Zip(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(e) => match e {
                ValidationError::NoFiles => "no_files",
                ValidationError::TooManyFiles { .. } => "too_many_files",
                ValidationError::Multipart(_) => "invalid_multipart",
                ValidationError::InvalidField(_) => "invalid_field",
                ValidationError::UnexpectedFile(_) => "unexpected_field",
                ValidationError::TooLarge { .. } => "payload_too_large",
            },
            Error::Conversion { failures, .. } => match failures.first().map(|f| &f.error) {
                Some(EncodeError::TimedOut(_)) => "encode_timeout",
                Some(EncodeError::Unavailable(_)) => "encoder_unavailable",
                _ => "conversion_failed",
            },
            Error::Archive(_) | Error::Zip(_) => "archive_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}
