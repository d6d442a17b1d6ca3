//! In-process byte streams connecting bridges and shell sessions.
//!
//! [`channel`] returns a writer/reader pair over an unbounded queue. Writes
//! never suspend, so a bridge can push a completed line from inside a
//! synchronous byte callback. The reader is the single consumer and can pull
//! either whole lines or the next chunk of bytes.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use embsh_types::error::{Result, ShellError};
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;

/// Create a connected writer/reader pair.
pub fn channel() -> (StreamWriter, StreamReader) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        StreamWriter { tx },
        StreamReader {
            rx,
            buf: BytesMut::new(),
        },
    )
}

/// Producer half. Cloning adds another producer; the stream ends when every
/// writer has been dropped.
#[derive(Debug, Clone)]
pub struct StreamWriter {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl StreamWriter {
    /// Queue bytes for the reader without suspending.
    pub fn feed(&self, data: impl Into<Bytes>) -> Result<()> {
        let data = data.into();
        if data.is_empty() {
            return Ok(());
        }
        self.tx.send(data).map_err(|_| ShellError::StreamClosed)
    }

    /// Whether the reader has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl AsyncWrite for StreamWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.feed(Bytes::copy_from_slice(buf)) {
            Ok(()) => Poll::Ready(Ok(buf.len())),
            Err(_) => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "stream reader dropped",
            ))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Consumer half. Not `Clone`: a stream has exactly one reader.
#[derive(Debug)]
pub struct StreamReader {
    rx: mpsc::UnboundedReceiver<Bytes>,
    /// Bytes received but not yet handed out.
    buf: BytesMut,
}

impl StreamReader {
    /// Read up to and including the next `\n`.
    ///
    /// Returns `None` at end of stream. A trailing partial line at end of
    /// stream is returned without a terminator.
    pub async fn read_line(&mut self) -> Option<Bytes> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                return Some(self.buf.split_to(pos + 1).freeze());
            }
            match self.rx.recv().await {
                Some(chunk) => self.buf.extend_from_slice(&chunk),
                None if self.buf.is_empty() => return None,
                None => return Some(self.buf.split().freeze()),
            }
        }
    }

    /// Read up to `max` bytes, waiting only if nothing is buffered.
    ///
    /// Returns `None` at end of stream.
    pub async fn read(&mut self, max: usize) -> Option<Bytes> {
        if self.buf.is_empty() {
            let chunk = self.rx.recv().await?;
            self.buf.extend_from_slice(&chunk);
        }
        let n = max.min(self.buf.len());
        Some(self.buf.split_to(n).freeze())
    }
}
