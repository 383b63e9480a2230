//! Byte-stream source for the sender.
//!
//! [`ChunkReader`] cuts any `AsyncRead` into fixed-size chunks and knows, at
//! the moment it hands a chunk out, whether it is the last one. It achieves
//! that by always holding the *next* chunk in reserve: the current chunk is
//! final exactly when the reserve comes back empty.
//!
//! An empty input still produces one (empty, final) chunk so the receiver
//! sees an end-of-stream marker.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

/// One slice of the input stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub bytes: Vec<u8>,
    /// No further bytes follow this chunk.
    pub is_last: bool,
}

/// Sequential chunked reader with one chunk of lookahead.
#[derive(Debug)]
pub struct ChunkReader<R> {
    inner: R,
    chunk_size: usize,
    /// Chunk read ahead of the caller; `None` once the input is exhausted.
    ahead: Option<Vec<u8>>,
    started: bool,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    /// `chunk_size` must be non-zero; [`crate::config`] guarantees it.
    pub fn new(inner: R, chunk_size: usize) -> Self {
        debug_assert!(chunk_size > 0, "chunk size must be positive");
        Self {
            inner,
            chunk_size,
            ahead: None,
            started: false,
        }
    }

    /// Next chunk of input, or `None` once every chunk has been handed out.
    ///
    /// Read failures are returned as-is; the caller treats them as fatal.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Chunk>> {
        if !self.started {
            self.started = true;
            let first = self.fill().await?;
            self.ahead = Some(first);
        }

        let Some(bytes) = self.ahead.take() else {
            return Ok(None);
        };

        let following = self.fill().await?;
        let is_last = following.is_empty();
        if !is_last {
            self.ahead = Some(following);
        }
        Ok(Some(Chunk { bytes, is_last }))
    }

    /// Read up to `chunk_size` bytes, stopping short only at end of input.
    async fn fill(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.inner.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }
}
