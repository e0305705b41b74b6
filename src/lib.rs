//! # webp-convert
//!
//! HTTP service converting uploaded images to WebP with the external `cwebp`
//! encoder.
//!
//! ## Design
//!
//! - **One request, one batch** - every upload of a request becomes a job;
//!   jobs run concurrently and the batch settles on a single artifact
//! - **All-or-nothing by default** - one failed job fails the whole batch
//!   unless the partial-success policy is configured
//! - **Nothing persists** - each request works in its own scoped directory
//!   that is deleted once the response is sent, abandoned, or failed
//!
//! ## Quick Start
//!
//! ```no_run
//! use webp_convert::{BatchOrchestrator, Config, encoder};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.batch.max_files = 10;
//!     config.validate()?;
//!     let config = Arc::new(config);
//!
//!     let encoder = encoder::from_config(&config.encoder);
//!     let orchestrator = Arc::new(BatchOrchestrator::from_config(encoder, &config));
//!
//!     webp_convert::api::start_api_server(orchestrator, config).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP server module
pub mod api;
/// Batch orchestration, workspaces and cleanup
pub mod batch;
/// Configuration types
pub mod config;
/// WebP encoder invocation
pub mod encoder;
/// Error types
pub mod error;
/// Output filename resolution
pub mod naming;
/// Encoder option normalization
pub mod options;
/// Core types
pub mod types;

// Re-export commonly used types
pub use batch::{BatchOrchestrator, BatchOutput, CleanupManager, OutputKind, Workspace};
pub use config::{BatchConfig, Config, EncoderConfig, FailurePolicy, ServerConfig};
pub use encoder::{CliEncoder, Encoder, UnavailableEncoder};
pub use error::{EncodeError, Error, JobFailure, Result, ToHttpStatus, ValidationError};
pub use options::{EncodeOptions, RawEncodeOptions, Resize};
pub use types::{
    BatchRequest, BatchResult, Capabilities, Job, JobId, JobStatus, StagedUpload,
};

/// Wait for a termination signal
///
/// Used as the HTTP server's graceful-shutdown trigger.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

/// Wait for a termination signal (Ctrl+C)
#[cfg(not(unix))]
pub async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
