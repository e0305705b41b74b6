//! Encoder stand-in for hosts without cwebp

use super::traits::{EncodedArtifact, Encoder};
use crate::error::EncodeError;
use crate::options::EncodeOptions;
use async_trait::async_trait;
use std::path::Path;

/// Encoder used when no cwebp binary is available
///
/// Keeps the server up (health and capabilities still answer) while every
/// conversion fails with [`EncodeError::Unavailable`].
///
/// # Examples
///
/// ```
/// use webp_convert::encoder::{Encoder, UnavailableEncoder};
/// use webp_convert::options::EncodeOptions;
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() {
/// let encoder = UnavailableEncoder;
/// let result = encoder
///     .encode(Path::new("in.png"), Path::new("out.webp"), &EncodeOptions::default())
///     .await;
/// assert!(result.is_err());
/// # }
/// ```
pub struct UnavailableEncoder;

#[async_trait]
impl Encoder for UnavailableEncoder {
    async fn encode(
        &self,
        _input: &Path,
        _output: &Path,
        _options: &EncodeOptions,
    ) -> Result<EncodedArtifact, EncodeError> {
        Err(EncodeError::Unavailable(
            "WebP conversion requires the external cwebp binary. \
             Configure encoder.binary_path or ensure cwebp is in PATH."
                .into(),
        ))
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
