use std::io::{self, ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::codec::{check_declared_len, decode_prefix, MAX_LEN, PREFIX_LEN};
use crate::error::{FrameError, Result};
use crate::io::{read_full, Partial};

/// Reusable receive-side scratch storage for length-prefixed messages.
///
/// Each [`read_from`](Self::read_from) reads one length prefix and the
/// payload it declares into the same buffer. The storage only ever grows, so
/// one instance driven across many reads settles at the size of the largest
/// message seen and stops allocating.
///
/// The view returned by [`bytes`](Self::bytes) borrows the buffer and so
/// cannot outlive the next read. Not meant to be shared: give each stream its
/// own instance.
pub struct ReceiveBuffer {
    // Zero-filled up to its high-water mark; `len` is never reduced.
    buf: BytesMut,
    size: usize,
    max_len: usize,
}

impl ReceiveBuffer {
    /// An empty buffer accepting payloads up to [`MAX_LEN`].
    pub fn new() -> Self {
        Self::with_max_len(MAX_LEN)
    }

    /// Preallocate room for payloads of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buffer = Self::new();
        buffer.reserve(capacity);
        buffer
    }

    /// An empty buffer with a custom read-side bound.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            size: 0,
            max_len,
        }
    }

    /// Read one frame from `reader`, returning the payload length.
    ///
    /// Blocks until the prefix and the whole payload have arrived, looping
    /// over short reads. On error the payload view is left empty:
    /// - prefix not obtained: [`FrameError::Io`] (end-of-stream before any prefix
    ///   byte is `UnexpectedEof`, a truncated prefix is `InvalidData`)
    /// - declared length above the bound: [`FrameError::MessageTooLarge`], no payload consumed
    /// - payload cut short: [`FrameError::ShortRead`] with the bytes that did arrive
    pub fn read_from<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<usize> {
        self.size = 0;
        self.reserve(PREFIX_LEN);
        read_full(reader, &mut self.buf[..PREFIX_LEN]).map_err(prefix_error)?;

        let len = self.declared_len()?;
        if len == 0 {
            trace!("read empty message");
            return Ok(0);
        }

        self.reserve(len);
        read_full(reader, &mut self.buf[..len]).map_err(|partial| FrameError::ShortRead {
            read: partial.transferred,
            expected: len,
            source: partial.error,
        })?;

        self.size = len;
        trace!(len, "read message");
        Ok(len)
    }

    /// Async counterpart of [`read_from`](Self::read_from).
    #[cfg(feature = "async")]
    pub async fn read_from_async<R>(&mut self, reader: &mut R) -> Result<usize>
    where
        R: tokio::io::AsyncRead + Unpin + ?Sized,
    {
        use crate::io::read_full_async;

        self.size = 0;
        self.reserve(PREFIX_LEN);
        read_full_async(reader, &mut self.buf[..PREFIX_LEN])
            .await
            .map_err(prefix_error)?;

        let len = self.declared_len()?;
        if len == 0 {
            trace!("read empty message");
            return Ok(0);
        }

        self.reserve(len);
        read_full_async(reader, &mut self.buf[..len])
            .await
            .map_err(|partial| FrameError::ShortRead {
                read: partial.transferred,
                expected: len,
                source: partial.error,
            })?;

        self.size = len;
        trace!(len, "read message");
        Ok(len)
    }

    /// The most recently read payload.
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.size]
    }

    /// An owned copy of the most recently read payload.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.bytes())
    }

    /// Length of the most recently read payload.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Bytes of scratch storage currently held. Never decreases.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Change the bound applied to subsequent reads.
    pub fn set_max_len(&mut self, max_len: usize) {
        self.max_len = max_len;
    }

    fn declared_len(&self) -> Result<usize> {
        let mut prefix = [0u8; PREFIX_LEN];
        prefix.copy_from_slice(&self.buf[..PREFIX_LEN]);
        let declared = decode_prefix(&prefix);
        check_declared_len(declared, self.max_len).inspect_err(|_| {
            debug!(declared, max = self.max_len, "rejecting oversized message");
        })
    }

    fn reserve(&mut self, needed: usize) {
        if self.buf.len() < needed {
            self.buf.resize(needed, 0);
        }
    }
}

/// A prefix cut off after some bytes is corruption, not a clean end of stream.
fn prefix_error(partial: Partial) -> FrameError {
    if partial.transferred > 0 && partial.error.kind() == ErrorKind::UnexpectedEof {
        return FrameError::Io(io::Error::new(
            ErrorKind::InvalidData,
            format!(
                "stream ended after {} of {PREFIX_LEN} length prefix bytes",
                partial.transferred
            ),
        ));
    }
    FrameError::Io(partial.error)
}

impl Default for ReceiveBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReceiveBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiveBuffer")
            .field("len", &self.size)
            .field("capacity", &self.capacity())
            .field("max_len", &self.max_len)
            .finish()
    }
}
