//! Shared fake encoder for batch and API tests.

use crate::encoder::{EncodedArtifact, Encoder};
use crate::error::EncodeError;
use crate::options::EncodeOptions;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Bytes written in front of the input by the fake encoder
pub(crate) const FAKE_WEBP_HEADER: &[u8] = b"RIFF\x24\x00\x00\x00WEBPVP8 ";

/// How the fake encoder reacts to every invocation
#[derive(Clone, Copy, Debug)]
pub(crate) enum FakeBehavior {
    /// Write a WebP-looking output
    Succeed,
    /// Report a non-zero exit
    Fail,
    /// Fail only for inputs whose bytes contain the marker
    FailInputsContaining(&'static str),
    /// Report success without writing anything
    SucceedWithoutOutput,
    /// Report success after writing an empty file
    SucceedWithEmptyOutput,
    /// Never finish
    Hang,
}

/// In-process encoder double recording how it was called
pub(crate) struct FakeEncoder {
    behavior: FakeBehavior,
    delay: Option<Duration>,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    last_options: Mutex<Option<EncodeOptions>>,
}

impl FakeEncoder {
    pub(crate) fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        }
    }

    /// Sleep this long inside every invocation
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of invocations observed running at once
    pub(crate) fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub(crate) fn last_options(&self) -> Option<EncodeOptions> {
        *self.last_options.lock().unwrap()
    }

    async fn encode_inner(&self, input: &Path, output: &Path) -> Result<(), EncodeError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let exited = || EncodeError::Exited {
            tool: "fake-cwebp".to_string(),
            code: Some(1),
            stderr: "Could not process file".to_string(),
        };

        match self.behavior {
            FakeBehavior::Succeed => write_output(input, output).await,
            FakeBehavior::Fail => Err(exited()),
            FakeBehavior::FailInputsContaining(marker) => {
                let bytes = tokio::fs::read(input).await.unwrap_or_default();
                if contains(&bytes, marker.as_bytes()) {
                    Err(exited())
                } else {
                    write_output(input, output).await
                }
            }
            FakeBehavior::SucceedWithoutOutput => Ok(()),
            FakeBehavior::SucceedWithEmptyOutput => {
                tokio::fs::write(output, b"").await.unwrap();
                Ok(())
            }
            FakeBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        options: &EncodeOptions,
    ) -> Result<EncodedArtifact, EncodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(*options);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        let result = self.encode_inner(input, output).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        result?;
        Ok(EncodedArtifact {
            path: output.to_path_buf(),
            size_bytes: tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0),
        })
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

async fn write_output(input: &Path, output: &Path) -> Result<(), EncodeError> {
    let mut bytes = FAKE_WEBP_HEADER.to_vec();
    bytes.extend(tokio::fs::read(input).await.unwrap_or_default());
    tokio::fs::write(output, bytes).await.unwrap();
    Ok(())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}
