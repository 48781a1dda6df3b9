use std::io::Read;

use bytes::Bytes;
use prefixio_transport::Stream;

use crate::buffer::ReceiveBuffer;
use crate::codec::FrameConfig;
use crate::error::{transport_to_frame_error, Result};

/// Reads frames from an owned stream through one reused [`ReceiveBuffer`].
pub struct FrameReader<T> {
    inner: T,
    buf: ReceiveBuffer,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: ReceiveBuffer::with_max_len(config.max_payload_size),
            config,
        }
    }

    /// Read the next frame (blocking) and borrow its payload.
    ///
    /// End-of-stream before a new frame starts is reported as an error for
    /// which [`FrameError::is_end_of_stream`](crate::FrameError::is_end_of_stream)
    /// holds.
    pub fn read_frame(&mut self) -> Result<&[u8]> {
        self.buf.read_from(&mut self.inner)?;
        Ok(self.buf.bytes())
    }

    /// Read the next frame and copy its payload out.
    pub fn read_frame_owned(&mut self) -> Result<Bytes> {
        self.buf.read_from(&mut self.inner)?;
        Ok(self.buf.to_bytes())
    }

    /// The receive buffer, holding the most recent payload.
    pub fn buffer(&self) -> &ReceiveBuffer {
        &self.buf
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum payload size for subsequent reads.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
        self.buf.set_max_len(max_payload_size);
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<Stream> {
    /// Create a frame reader for a transport stream and apply its read timeout.
    pub fn with_config_stream(inner: Stream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}
