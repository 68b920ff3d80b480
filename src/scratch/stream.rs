use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

use super::artifact::TempArtifact;

/// Read size used when streaming an artifact.
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// A byte stream over an artifact's file that owns the artifact.
///
/// The artifact is released when the stream is dropped, which the HTTP layer
/// does after the last chunk has been written or when the client goes away.
pub struct ArtifactStream {
    file: File,
    buf: Box<[u8]>,
    len: u64,
    done: bool,
    artifact: TempArtifact,
}

impl ArtifactStream {
    /// Open the artifact's file for streaming.
    ///
    /// On error the artifact is dropped, and therefore released.
    pub async fn open(artifact: TempArtifact) -> io::Result<Self> {
        let file = File::open(artifact.path()).await?;
        let len = file.metadata().await?.len();

        Ok(Self {
            file,
            buf: vec![0u8; STREAM_CHUNK_SIZE].into_boxed_slice(),
            len,
            done: false,
            artifact,
        })
    }

    /// Total number of bytes the stream will yield.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn artifact(&self) -> &TempArtifact {
        &self.artifact
    }
}

impl Stream for ArtifactStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        let mut read_buf = ReadBuf::new(&mut this.buf);
        match Pin::new(&mut this.file).poll_read(cx, &mut read_buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => {
                this.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(Ok(())) => {
                let filled = read_buf.filled();
                if filled.is_empty() {
                    this.done = true;
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Ok(Bytes::copy_from_slice(filled))))
                }
            }
        }
    }
}
