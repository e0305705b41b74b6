//! WebP encoder invocation
//!
//! The encoder is the one collaborator this service does not own: an external
//! `cwebp` process that turns an input image into a WebP file. It sits behind
//! the [`Encoder`] trait so the batch logic can run against fakes in tests.
//!
//! ## Implementations
//!
//! - [`CliEncoder`]: runs the external `cwebp` binary
//! - [`UnavailableEncoder`]: stand-in when no binary was found; every
//!   conversion fails with [`EncodeError::Unavailable`](crate::error::EncodeError::Unavailable)
//!
//! ## Usage
//!
//! ```no_run
//! use webp_convert::encoder::{CliEncoder, Encoder};
//! use webp_convert::options::EncodeOptions;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let encoder = CliEncoder::from_path().expect("cwebp binary not found");
//!
//!     let artifact = encoder
//!         .encode(Path::new("in.png"), Path::new("out.webp"), &EncodeOptions::default())
//!         .await?;
//!     println!("wrote {} bytes", artifact.size_bytes);
//!
//!     Ok(())
//! }
//! ```

mod cli;
mod traits;
mod unavailable;

pub use cli::{CliEncoder, WEBP_SIGNATURE_LEN, has_webp_signature};
pub use traits::{EncodedArtifact, Encoder};
pub use unavailable::UnavailableEncoder;

use crate::config::EncoderConfig;
use std::sync::Arc;

/// Pick the encoder described by the configuration
///
/// An explicit `binary_path` wins; otherwise `cwebp` is looked up in `PATH`
/// when `search_path` is set. Without a binary the service still starts, but
/// every conversion fails until one is installed.
pub fn from_config(config: &EncoderConfig) -> Arc<dyn Encoder> {
    if let Some(path) = &config.binary_path {
        tracing::info!(path = %path.display(), "using configured cwebp binary");
        return Arc::new(CliEncoder::new(path.clone()));
    }

    if config.search_path
        && let Some(encoder) = CliEncoder::from_path()
    {
        tracing::info!(path = %encoder.binary_path().display(), "found cwebp in PATH");
        return Arc::new(encoder);
    }

    tracing::warn!("no cwebp binary available, conversions will fail");
    Arc::new(UnavailableEncoder)
}
