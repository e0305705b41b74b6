//! Configuration types for webp-convert

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Environment variable overriding the listening port
pub const ENV_PORT: &str = "PORT";

/// Environment variable overriding the working directory
pub const ENV_WORK_DIR: &str = "WEBP_CONVERT_WORK_DIR";

/// Main configuration for the conversion service
///
/// Every field has a default, so an empty JSON object (or no config file at
/// all) yields a working setup that looks up `cwebp` in `PATH`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// External encoder settings
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// Batch orchestration settings
    #[serde(default)]
    pub batch: BatchConfig,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;

        serde_json::from_str(&contents).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })
    }

    /// Apply `PORT` and `WEBP_CONVERT_WORK_DIR` from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var(ENV_PORT) {
            let port: u16 = port.trim().parse().map_err(|_| Error::Config {
                message: format!("{ENV_PORT} must be a port number, got {port:?}"),
                key: Some("server.bind_address".to_string()),
            })?;
            self.server.bind_address.set_port(port);
        }

        if let Ok(dir) = std::env::var(ENV_WORK_DIR)
            && !dir.trim().is_empty()
        {
            self.batch.work_dir = PathBuf::from(dir);
        }

        Ok(())
    }

    /// Check invariants the defaults already satisfy but a file may break
    pub fn validate(&self) -> Result<()> {
        if self.batch.max_files == 0 {
            return Err(invalid("batch.max_files", "must be at least 1"));
        }

        if self.batch.max_concurrent_jobs == Some(0) {
            return Err(invalid(
                "batch.max_concurrent_jobs",
                "must be at least 1 when set",
            ));
        }

        let archive_name = self.batch.archive_name.trim();
        if archive_name.is_empty() || !archive_name.to_ascii_lowercase().ends_with(".zip") {
            return Err(invalid("batch.archive_name", "must be a non-empty .zip filename"));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(invalid("server.max_upload_bytes", "must be greater than 0"));
        }

        if self.encoder.timeout_secs == Some(0) {
            return Err(invalid(
                "encoder.timeout_secs",
                "must be greater than 0 (use null to disable)",
            ));
        }

        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> Error {
    Error::Config {
        message: format!("{key} {message}"),
        key: Some(key.to_string()),
    }
}

/// HTTP server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:3000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Directory served for any path no route matches (upload page, robots.txt)
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Maximum request body size in bytes (default: 64 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            static_dir: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// External encoder configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Path to the cwebp executable (auto-detected if None)
    #[serde(default)]
    pub binary_path: Option<PathBuf>,

    /// Whether to search PATH for cwebp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Per-job deadline in seconds (default: 120, null = no deadline)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: Option<u64>,
}

impl EncoderConfig {
    /// Per-job deadline, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            search_path: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// What a batch returns when some of its jobs fail
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Any failed job fails the whole batch (default)
    #[default]
    AllOrNothing,
    /// Archive the succeeded outputs plus a manifest of failures
    Partial,
}

/// Batch orchestration configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Directory holding per-request workspaces (default: "uploads")
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Maximum number of files per request (default: 20)
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum encoder processes running at once per batch (None = all at once)
    #[serde(default)]
    pub max_concurrent_jobs: Option<usize>,

    /// Behavior when some jobs of a batch fail
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Download name of multi-file archives
    #[serde(default = "default_archive_name")]
    pub archive_name: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            max_files: default_max_files(),
            max_concurrent_jobs: None,
            failure_policy: FailurePolicy::default(),
            archive_name: default_archive_name(),
        }
    }
}

// Default value functions
fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024 // 64 MiB
}

fn default_timeout_secs() -> Option<u64> {
    Some(120)
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_files() -> usize {
    20
}

fn default_archive_name() -> String {
    "converted-images.webp.zip".to_string()
}
