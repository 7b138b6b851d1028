//! Shared test helpers for feeding the status stream from memory.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// In-memory stream that yields `data`, then fails once with `fault`, then
/// reports end of stream.
pub(crate) struct FaultyStream {
    data: io::Cursor<Vec<u8>>,
    fault: Option<io::ErrorKind>,
}

impl FaultyStream {
    pub(crate) fn new(data: &str, fault: io::ErrorKind) -> Self {
        Self {
            data: io::Cursor::new(data.as_bytes().to_vec()),
            fault: Some(fault),
        }
    }
}

impl AsyncRead for FaultyStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let pos = self.data.position() as usize;
        let remaining = self.data.get_ref().len() - pos;
        if remaining > 0 {
            let n = remaining.min(buf.remaining());
            buf.put_slice(&self.data.get_ref()[pos..pos + n]);
            self.data.set_position((pos + n) as u64);
            return Poll::Ready(Ok(()));
        }
        match self.fault.take() {
            Some(kind) => Poll::Ready(Err(io::Error::new(kind, "stream read failed"))),
            None => Poll::Ready(Ok(())),
        }
    }
}
