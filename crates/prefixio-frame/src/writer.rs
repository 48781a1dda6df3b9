use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use prefixio_transport::Stream;
use tracing::{trace, warn};

use crate::codec::{encode_frame, encode_prefix, FrameConfig, PREFIX_LEN};
use crate::error::{transport_to_frame_error, FrameError, Result};
use crate::io::write_full;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Write one frame: the 8-byte big-endian length of `payload`, then `payload`.
///
/// Returns the number of payload bytes written. No size limit is applied here;
/// readers reject anything above their bound, so callers must keep messages
/// within it themselves.
///
/// A failure while writing the prefix is [`FrameError::Io`] and no payload is
/// written. A failure part-way through the payload is
/// [`FrameError::ShortWrite`] carrying the count that made it out.
pub fn write_bytes<W: Write + ?Sized>(writer: &mut W, payload: &[u8]) -> Result<usize> {
    let prefix = encode_prefix(payload.len() as u64);
    write_full(writer, &prefix).map_err(|partial| FrameError::Io(partial.error))?;
    write_full(writer, payload).map_err(|partial| FrameError::ShortWrite {
        written: partial.transferred,
        expected: payload.len(),
        source: partial.error,
    })?;
    Ok(payload.len())
}

/// Async counterpart of [`write_bytes`].
#[cfg(feature = "async")]
pub async fn write_bytes_async<W>(writer: &mut W, payload: &[u8]) -> Result<usize>
where
    W: tokio::io::AsyncWrite + Unpin + ?Sized,
{
    use crate::io::write_full_async;

    let prefix = encode_prefix(payload.len() as u64);
    write_full_async(writer, &prefix)
        .await
        .map_err(|partial| FrameError::Io(partial.error))?;
    write_full_async(writer, payload)
        .await
        .map_err(|partial| FrameError::ShortWrite {
            written: partial.transferred,
            expected: payload.len(),
            source: partial.error,
        })?;
    Ok(payload.len())
}

/// Writes frames to an owned stream.
///
/// Each frame is staged in one buffer and handed to the stream in as few
/// writes as it will take, then flushed.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Frame and send one payload, then flush. Returns the payload length.
    ///
    /// Payloads above `max_payload_size` are still sent, with a warning:
    /// the bound only protects readers.
    pub fn send(&mut self, payload: &[u8]) -> Result<usize> {
        if payload.len() > self.config.max_payload_size {
            warn!(
                size = payload.len(),
                max = self.config.max_payload_size,
                "payload exceeds the read-side maximum; peers will reject it"
            );
        }

        self.buf.clear();
        encode_frame(payload, &mut self.buf);

        if let Err(partial) = write_full(&mut self.inner, &self.buf) {
            return Err(match partial.transferred.checked_sub(PREFIX_LEN) {
                Some(written) => FrameError::ShortWrite {
                    written,
                    expected: payload.len(),
                    source: partial.error,
                },
                None => FrameError::Io(partial.error),
            });
        }
        trace!(len = payload.len(), "sent message");

        self.flush()?;
        Ok(payload.len())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update the size above which `send` warns.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<Stream> {
    /// Create a frame writer for a transport stream and apply its write timeout.
    pub fn with_config_stream(inner: Stream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}
