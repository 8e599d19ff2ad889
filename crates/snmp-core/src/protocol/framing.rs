//! Stream reassembly for length-prefixed messages.
//!
//! A byte stream delivers data in whatever pieces the transport chooses: one
//! message may arrive across many reads, and one read may end in the middle
//! of the length prefix. [`FrameReader`] recovers exactly one complete
//! message per call.
//!
//! # Algorithm
//!
//! 1. Read exactly 4 bytes, looping on short reads, to learn `total_size`.
//! 2. Validate `total_size` against the minimum header and the configured
//!    maximum before allocating anything.
//! 3. Read the remaining `total_size - 4` bytes, asking the transport for at
//!    most [`MAX_READ_CHUNK`] bytes per call and never for more than the
//!    current message still needs.
//!
//! # Invariants
//!
//! - [INV-FRM-001] The reader never requests bytes past the end of the
//!   current message, so the next message's bytes stay in the transport.
//! - [INV-FRM-002] A zero-byte read before any byte of a frame is
//!   [`ProtocolError::ConnectionClosed`]; one after part of the frame has
//!   arrived is [`ProtocolError::TruncatedFrame`].
//! - [INV-FRM-003] Size limits are enforced before allocation.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use super::error::{
    LENGTH_PREFIX_SIZE, MAX_MESSAGE_SIZE, MAX_READ_CHUNK, MIN_MESSAGE_SIZE, ProtocolError,
    ProtocolResult,
};

/// Reads complete messages from a byte stream.
///
/// One reader per connection; it holds no buffered bytes between calls.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    max_frame_size: usize,
    chunk_size: usize,
}

impl<R> FrameReader<R> {
    /// Create a reader with the default limits.
    #[must_use]
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            max_frame_size: MAX_MESSAGE_SIZE,
            chunk_size: MAX_READ_CHUNK,
        }
    }

    /// Set the largest accepted `total_size`.
    #[must_use]
    pub const fn with_max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max;
        self
    }

    /// Set the per-read ceiling. Values below 1 are treated as 1.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Largest accepted `total_size`.
    #[must_use]
    pub const fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Get a reference to the underlying stream.
    #[must_use]
    pub const fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Get a mutable reference to the underlying stream.
    #[allow(clippy::missing_const_for_fn)] // const fn with &mut return requires nightly
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader and return the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Read one complete message (header and payload).
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::ConnectionClosed`] if the stream ends before the
    ///   first byte of the frame
    /// - [`ProtocolError::TruncatedFrame`] if it ends part way through
    /// - [`ProtocolError::FrameTooShort`] / [`ProtocolError::FrameTooLarge`]
    ///   if the length prefix is out of bounds
    /// - [`ProtocolError::Io`] for other transport failures
    pub async fn read_frame(&mut self) -> ProtocolResult<Bytes> {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        self.fill(&mut prefix, 0).await?;

        let total_size = u32::from_be_bytes(prefix) as usize;
        if total_size < MIN_MESSAGE_SIZE {
            return Err(ProtocolError::FrameTooShort {
                size: total_size,
                min: MIN_MESSAGE_SIZE,
            });
        }
        if total_size > self.max_frame_size {
            return Err(ProtocolError::FrameTooLarge {
                size: total_size,
                max: self.max_frame_size,
            });
        }

        let mut frame = vec![0u8; total_size];
        frame[..LENGTH_PREFIX_SIZE].copy_from_slice(&prefix);
        self.fill(&mut frame[LENGTH_PREFIX_SIZE..], LENGTH_PREFIX_SIZE)
            .await?;

        trace!(total_size, "frame reassembled");
        Ok(Bytes::from(frame))
    }

    /// Read one complete message within `budget`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Timeout`] if the budget elapses, otherwise
    /// the errors of [`FrameReader::read_frame`].
    pub async fn read_frame_timeout(&mut self, budget: Duration) -> ProtocolResult<Bytes> {
        tokio::time::timeout(budget, self.read_frame())
            .await
            .map_err(|_| ProtocolError::timeout(budget))?
    }

    /// Fill `buf` completely, one bounded read at a time. `received` counts
    /// the bytes of this frame already read.
    async fn fill(&mut self, buf: &mut [u8], received: usize) -> ProtocolResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let want = (buf.len() - filled).min(self.chunk_size);
            let read = self
                .inner
                .read(&mut buf[filled..filled + want])
                .await
                .map_err(map_io_error)?;
            if read == 0 {
                return Err(match received + filled {
                    0 => ProtocolError::ConnectionClosed,
                    received => ProtocolError::TruncatedFrame { received },
                });
            }
            filled += read;
        }
        Ok(())
    }
}

/// Write one complete encoded message within `budget`.
///
/// # Errors
///
/// Returns [`ProtocolError::Timeout`] if the budget elapses,
/// [`ProtocolError::ConnectionClosed`] if the peer has gone away, and
/// [`ProtocolError::Io`] for other transport failures.
pub async fn write_frame<W>(writer: &mut W, frame: &[u8], budget: Duration) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin,
{
    let write = async {
        writer.write_all(frame).await?;
        writer.flush().await
    };
    tokio::time::timeout(budget, write)
        .await
        .map_err(|_| ProtocolError::timeout(budget))?
        .map_err(map_io_error)
}

fn map_io_error(err: io::Error) -> ProtocolError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => ProtocolError::ConnectionClosed,
        _ => ProtocolError::Io(err),
    }
}
