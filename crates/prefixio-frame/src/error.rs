use std::io;

/// Errors that can occur while reading or writing length-prefixed frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The stream failed outside the payload phase, e.g. while transferring
    /// the 8-byte length prefix. End-of-stream before the first prefix byte
    /// surfaces here as `UnexpectedEof`; a partially received prefix as `InvalidData`.
    #[error("frame I/O error: {0}")]
    Io(#[from] io::Error),

    /// The declared payload length exceeds the read-side maximum.
    #[error("message too large at {size} bytes (max {max})")]
    MessageTooLarge { size: u64, max: usize },

    /// Fewer payload bytes than declared could be read.
    #[error("short read: got {read} of {expected} payload bytes: {source}")]
    ShortRead {
        read: usize,
        expected: usize,
        #[source]
        source: io::Error,
    },

    /// The payload could only be partially written.
    #[error("short write: wrote {written} of {expected} payload bytes: {source}")]
    ShortWrite {
        written: usize,
        expected: usize,
        #[source]
        source: io::Error,
    },
}

impl FrameError {
    /// Payload bytes moved before the failure. Zero for prefix and bound failures.
    pub fn bytes_transferred(&self) -> usize {
        match self {
            FrameError::ShortRead { read, .. } => *read,
            FrameError::ShortWrite { written, .. } => *written,
            FrameError::Io(_) | FrameError::MessageTooLarge { .. } => 0,
        }
    }

    /// True when the stream ended cleanly, before any byte of the next
    /// length prefix arrived. A prefix cut off midway is not a clean end.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, FrameError::Io(err) if err.kind() == io::ErrorKind::UnexpectedEof)
    }

    /// True for framing violations, as opposed to transport problems.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            FrameError::MessageTooLarge { .. } | FrameError::ShortRead { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

pub(crate) fn transport_to_frame_error(err: prefixio_transport::TransportError) -> FrameError {
    use prefixio_transport::TransportError;

    match err {
        TransportError::Io(io) | TransportError::Accept(io) => FrameError::Io(io),
        TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
            FrameError::Io(source)
        }
        other => FrameError::Io(io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_transferred_reports_partial_progress() {
        let err = FrameError::ShortRead {
            read: 5,
            expected: 9,
            source: io::Error::from(io::ErrorKind::UnexpectedEof),
        };
        assert_eq!(err.bytes_transferred(), 5);
        assert!(err.is_protocol_violation());
        assert!(!err.is_end_of_stream());

        let err = FrameError::ShortWrite {
            written: 2,
            expected: 3,
            source: io::Error::from(io::ErrorKind::BrokenPipe),
        };
        assert_eq!(err.bytes_transferred(), 2);
        assert!(!err.is_protocol_violation());
    }

    #[test]
    fn end_of_stream_only_for_prefix_eof() {
        let eof = FrameError::from(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(eof.is_end_of_stream());
        assert_eq!(eof.bytes_transferred(), 0);

        let reset = FrameError::from(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(!reset.is_end_of_stream());
    }

    #[test]
    fn too_large_message_mentions_declared_length() {
        let err = FrameError::MessageTooLarge {
            size: 1_048_577,
            max: 1_048_576,
        };
        assert_eq!(
            err.to_string(),
            "message too large at 1048577 bytes (max 1048576)"
        );
        assert_eq!(err.bytes_transferred(), 0);
    }
}
