//! Streaming response bodies that clean up after themselves

use crate::batch::CleanupManager;
use axum::body::Body;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Stream wrapper that hands its [`CleanupManager`] off once the stream ends
///
/// Cleanup starts when the inner stream is exhausted or when the wrapper is
/// dropped, whichever comes first. A client disconnect drops the body, so the
/// artifacts are deleted in that case too.
pub struct CleanupOnDrop<S> {
    inner: S,
    cleanup: Option<CleanupManager>,
}

impl<S> CleanupOnDrop<S> {
    /// Wrap `inner`, deleting the batch artifacts when it is done
    pub fn new(inner: S, cleanup: CleanupManager) -> Self {
        Self {
            inner,
            cleanup: Some(cleanup),
        }
    }

    fn finish(&mut self) {
        let Some(cleanup) = self.cleanup.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    cleanup.run().await;
                });
            }
            // No runtime: CleanupManager's own Drop deletes synchronously
            Err(_) => drop(cleanup),
        }
    }
}

impl<S, T> Stream for CleanupOnDrop<S>
where
    S: Stream<Item = std::io::Result<T>> + Unpin,
{
    type Item = std::io::Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let item = ready!(Pin::new(&mut self.inner).poll_next(cx));

        match &item {
            None => self.finish(),
            Some(Err(e)) => {
                let batch_id = self
                    .cleanup
                    .as_ref()
                    .map(|c| c.batch_id().to_string())
                    .unwrap_or_default();
                tracing::warn!(batch_id = %batch_id, error = %e, "failed to read response artifact");
            }
            Some(Ok(_)) => {}
        }

        Poll::Ready(item)
    }
}

impl<S> Drop for CleanupOnDrop<S> {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Response body streaming `file` from disk, then cleaning up the batch
pub fn file_body(file: File, cleanup: CleanupManager) -> Body {
    Body::from_stream(CleanupOnDrop::new(ReaderStream::new(file), cleanup))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Workspace;
    use axum::body::to_bytes;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn wait_until_gone(path: &Path) {
        for _ in 0..100 {
            if !path.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{} still exists", path.display());
    }

    fn staged_output(root: &Path) -> (std::path::PathBuf, std::path::PathBuf, CleanupManager) {
        let workspace = Workspace::create(root).unwrap();
        let dir = workspace.path().to_path_buf();
        let output = workspace.output_path(crate::types::JobId(0));
        std::fs::write(&output, b"RIFF\x04\x00\x00\x00WEBP").unwrap();

        let mut cleanup = CleanupManager::new(workspace);
        cleanup.track(&output);
        (dir, output, cleanup)
    }

    #[tokio::test]
    async fn test_body_streams_file_then_cleans_up() {
        let root = tempdir().unwrap();
        let (dir, output, cleanup) = staged_output(root.path());

        let file = File::open(&output).await.unwrap();
        let bytes = to_bytes(file_body(file, cleanup), usize::MAX).await.unwrap();

        assert_eq!(&bytes[..], b"RIFF\x04\x00\x00\x00WEBP");
        wait_until_gone(&dir).await;
    }

    #[tokio::test]
    async fn test_abandoned_body_cleans_up() {
        let root = tempdir().unwrap();
        let (dir, output, cleanup) = staged_output(root.path());

        let file = File::open(&output).await.unwrap();
        let body = file_body(file, cleanup);
        drop(body);

        wait_until_gone(&dir).await;
    }

    #[test]
    fn test_drop_outside_runtime_cleans_up_synchronously() {
        let root = tempdir().unwrap();
        let (dir, _output, cleanup) = staged_output(root.path());

        let stream = CleanupOnDrop::new(futures::stream::empty::<std::io::Result<Vec<u8>>>(), cleanup);
        drop(stream);

        assert!(!dir.exists());
    }
}
