//! Trait and types for WebP encoding

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::EncodeError;
use crate::options::EncodeOptions;

/// Reference to an encoded file on disk
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedArtifact {
    /// Where the encoder wrote the output
    pub path: PathBuf,
    /// Size of the output in bytes
    pub size_bytes: u64,
}

/// Trait for converting one image into WebP
///
/// Implementations must not delete their input or a partially written output;
/// cleanup is owned by the batch.
///
/// # Examples
///
/// ```no_run
/// use webp_convert::encoder::{CliEncoder, Encoder};
/// use webp_convert::options::EncodeOptions;
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let encoder = CliEncoder::from_path().expect("cwebp not found in PATH");
/// let options = EncodeOptions { lossless: true, ..EncodeOptions::default() };
///
/// let artifact = encoder.encode(Path::new("logo.png"), Path::new("logo.webp"), &options).await?;
/// assert_eq!(artifact.path, Path::new("logo.webp"));
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Convert `input` into a WebP file at `output`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The encoder process cannot be started
    /// - The encoder exits with a non-zero status
    /// - The output is missing or not a WebP file
    /// - No encoder is available (for stub implementations)
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        options: &EncodeOptions,
    ) -> Result<EncodedArtifact, EncodeError>;

    /// Whether this encoder can convert anything at all
    fn is_available(&self) -> bool;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
