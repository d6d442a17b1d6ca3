//! Output adapter: line ending rewriting in front of a stream writer.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use embsh_types::error::Result;
use tokio::io::AsyncWrite;

use crate::stream::StreamWriter;

/// Line ending expected by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    /// Bytes pass through unchanged.
    Lf,
    /// Every `\n` becomes `\r\n` (telnet).
    CrLf,
}

impl LineEnding {
    /// Rewrite `data` for this line ending.
    pub fn apply(self, data: &[u8]) -> Bytes {
        match self {
            LineEnding::Lf => Bytes::copy_from_slice(data),
            LineEnding::CrLf => {
                let extra = data.iter().filter(|&&b| b == b'\n').count();
                let mut out = Vec::with_capacity(data.len() + extra);
                for &b in data {
                    if b == b'\n' {
                        out.push(b'\r');
                    }
                    out.push(b);
                }
                Bytes::from(out)
            },
        }
    }
}

/// Writer that applies a [`LineEnding`] to everything written through it.
///
/// Shared by a shell session (responses) and its bridge (editor echo), so
/// both paths get the same rewriting.
#[derive(Debug, Clone)]
pub struct OutputAdapter {
    inner: StreamWriter,
    ending: LineEnding,
}

impl OutputAdapter {
    pub fn new(inner: StreamWriter, ending: LineEnding) -> Self {
        Self { inner, ending }
    }

    /// Rewrite and queue `data` without suspending.
    pub fn feed(&self, data: &[u8]) -> Result<()> {
        self.inner.feed(self.ending.apply(data))
    }
}

impl AsyncWrite for OutputAdapter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.feed(buf) {
            Ok(()) => Poll::Ready(Ok(buf.len())),
            Err(e) => Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, e))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_crlf_rewrites_every_newline() {
        assert_eq!(LineEnding::CrLf.apply(b"world\n"), "world\r\n");
        assert_eq!(LineEnding::CrLf.apply(b"a\nb\n\n"), "a\r\nb\r\n\r\n");
        assert_eq!(LineEnding::CrLf.apply(b"no newline"), "no newline");
    }

    #[test]
    fn test_lf_passes_through() {
        assert_eq!(LineEnding::Lf.apply(b"world\n"), "world\n");
    }

    #[tokio::test]
    async fn test_adapter_async_write() {
        let (tx, mut rx) = stream::channel();
        let mut out = OutputAdapter::new(tx, LineEnding::CrLf);
        out.write_all(b"world\n").await.unwrap();
        assert_eq!(rx.read(64).await.unwrap(), "world\r\n");
    }

    #[tokio::test]
    async fn test_adapter_clones_share_stream() {
        let (tx, mut rx) = stream::channel();
        let out = OutputAdapter::new(tx, LineEnding::CrLf);
        let echo = out.clone();
        echo.feed(b"ab").unwrap();
        out.feed(b"\n").unwrap();
        drop((out, echo));
        assert_eq!(rx.read_line().await.unwrap(), "ab\r\n");
        assert!(rx.read_line().await.is_none());
    }
}
