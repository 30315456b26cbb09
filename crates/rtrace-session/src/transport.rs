//! Byte source abstraction for opening a turn's event stream

use std::path::PathBuf;

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use rtrace_wire::{ByteStream, Error, HttpSource, Result};
use tokio_util::{io::ReaderStream, sync::CancellationToken};

/// Something that can open the raw event stream for one user message
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Start a turn and return the response body as byte chunks.
    ///
    /// Implementations should end the stream with [`Error::Aborted`] once
    /// `cancel` fires.
    async fn open(&self, message: &str, cancel: CancellationToken) -> Result<ByteStream>;
}

/// End `body` with `Error::Aborted` as soon as `cancel` fires.
pub fn abortable(mut body: ByteStream, cancel: CancellationToken) -> ByteStream {
    Box::pin(stream! {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    yield Err(Error::Aborted);
                    return;
                }
                chunk = body.next() => match chunk {
                    Some(chunk) => yield chunk,
                    None => return,
                },
            }
        }
    })
}

#[async_trait]
impl ByteSource for HttpSource {
    async fn open(&self, message: &str, cancel: CancellationToken) -> Result<ByteStream> {
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Aborted),
            body = self.stream(message) => body?,
        };
        Ok(abortable(body, cancel))
    }
}

/// Replays a recorded event stream from disk, ignoring the message
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ByteSource for FileSource {
    async fn open(&self, _message: &str, cancel: CancellationToken) -> Result<ByteStream> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| Error::Transport(format!("{}: {}", self.path.display(), e)))?;
        let body = ReaderStream::new(file)
            .map(|chunk| chunk.map_err(|e| Error::Transport(e.to_string())));
        Ok(abortable(Box::pin(body), cancel))
    }
}
