//! CLI-based encoder using the external cwebp binary

use super::traits::{EncodedArtifact, Encoder};
use crate::error::EncodeError;
use crate::options::EncodeOptions;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

const TOOL_NAME: &str = "cwebp";

/// Bytes needed to recognize a WebP file (`RIFF` + size + `WEBP`)
pub const WEBP_SIGNATURE_LEN: usize = 12;

/// Whether `header` starts with the RIFF/WEBP container signature
pub fn has_webp_signature(header: &[u8]) -> bool {
    header.len() >= WEBP_SIGNATURE_LEN && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP"
}

/// Encoder running the external `cwebp` binary
///
/// The child process is killed if the encode future is dropped, so a deadline
/// enforced by the caller also stops the process.
///
/// # Examples
///
/// ```no_run
/// use webp_convert::encoder::CliEncoder;
/// use std::path::PathBuf;
///
/// // Create with explicit path
/// let encoder = CliEncoder::new(PathBuf::from("/usr/bin/cwebp"));
///
/// // Or auto-discover from PATH
/// let encoder = CliEncoder::from_path().expect("cwebp not found in PATH");
/// ```
pub struct CliEncoder {
    binary_path: PathBuf,
}

impl CliEncoder {
    /// Create a new CLI encoder with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find cwebp in PATH
    ///
    /// Returns `None` if the binary is not found.
    pub fn from_path() -> Option<Self> {
        which::which(TOOL_NAME).ok().map(Self::new)
    }

    /// Path of the binary this encoder runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    async fn check_output(output: &Path) -> Result<u64, EncodeError> {
        let invalid = |reason: String| EncodeError::InvalidOutput {
            path: output.to_path_buf(),
            reason,
        };

        let mut file = tokio::fs::File::open(output)
            .await
            .map_err(|e| invalid(format!("cannot open output: {e}")))?;
        let size_bytes = file
            .metadata()
            .await
            .map_err(|e| invalid(format!("cannot stat output: {e}")))?
            .len();

        let mut header = [0u8; WEBP_SIGNATURE_LEN];
        let read = file
            .read(&mut header)
            .await
            .map_err(|e| invalid(format!("cannot read output: {e}")))?;

        if !has_webp_signature(&header[..read]) {
            return Err(invalid("output is not a WebP file".to_string()));
        }

        Ok(size_bytes)
    }
}

#[async_trait]
impl Encoder for CliEncoder {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        options: &EncodeOptions,
    ) -> Result<EncodedArtifact, EncodeError> {
        let result = Command::new(&self.binary_path)
            .args(options.command_args(input, output))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| EncodeError::Spawn {
                tool: TOOL_NAME.to_string(),
                source,
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).into_owned();
            tracing::debug!(
                input = %input.display(),
                code = ?result.status.code(),
                %stderr,
                "cwebp failed"
            );
            return Err(EncodeError::Exited {
                tool: TOOL_NAME.to_string(),
                code: result.status.code(),
                stderr,
            });
        }

        let size_bytes = Self::check_output(output).await?;

        Ok(EncodedArtifact {
            path: output.to_path_buf(),
            size_bytes,
        })
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "cli-cwebp"
    }
}
