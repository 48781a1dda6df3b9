//! Exact-count transfers.
//!
//! A single `read`/`write` call may move fewer bytes than asked for without
//! failing. These loops keep going until the whole buffer is transferred or
//! the stream reports a terminal condition, and always say how far they got.

use std::io::{self, ErrorKind, Read, Write};

/// A transfer that stopped early.
#[derive(Debug)]
pub(crate) struct Partial {
    /// Bytes moved before the failure.
    pub(crate) transferred: usize,
    pub(crate) error: io::Error,
}

/// Fill `buf` completely. End-of-stream is reported as `UnexpectedEof`.
pub(crate) fn read_full<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
) -> std::result::Result<(), Partial> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(Partial {
                    transferred: filled,
                    error: io::Error::from(ErrorKind::UnexpectedEof),
                })
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(error) => {
                return Err(Partial {
                    transferred: filled,
                    error,
                })
            }
        }
    }
    Ok(())
}

/// Write all of `buf`. A sink accepting zero bytes is reported as `WriteZero`.
pub(crate) fn write_full<W: Write + ?Sized>(
    writer: &mut W,
    buf: &[u8],
) -> std::result::Result<(), Partial> {
    let mut written = 0usize;
    while written < buf.len() {
        match writer.write(&buf[written..]) {
            Ok(0) => {
                return Err(Partial {
                    transferred: written,
                    error: io::Error::from(ErrorKind::WriteZero),
                })
            }
            Ok(n) => written += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(error) => {
                return Err(Partial {
                    transferred: written,
                    error,
                })
            }
        }
    }
    Ok(())
}

#[cfg(feature = "async")]
pub(crate) async fn read_full_async<R: tokio::io::AsyncRead + Unpin + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
) -> std::result::Result<(), Partial> {
    use tokio::io::AsyncReadExt;

    let mut filled = 0usize;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => {
                return Err(Partial {
                    transferred: filled,
                    error: io::Error::from(ErrorKind::UnexpectedEof),
                })
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(error) => {
                return Err(Partial {
                    transferred: filled,
                    error,
                })
            }
        }
    }
    Ok(())
}

#[cfg(feature = "async")]
pub(crate) async fn write_full_async<W: tokio::io::AsyncWrite + Unpin + ?Sized>(
    writer: &mut W,
    buf: &[u8],
) -> std::result::Result<(), Partial> {
    use tokio::io::AsyncWriteExt;

    let mut written = 0usize;
    while written < buf.len() {
        match writer.write(&buf[written..]).await {
            Ok(0) => {
                return Err(Partial {
                    transferred: written,
                    error: io::Error::from(ErrorKind::WriteZero),
                })
            }
            Ok(n) => written += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(error) => {
                return Err(Partial {
                    transferred: written,
                    error,
                })
            }
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn read_full_loops_over_short_reads() {
        let mut reader = ByteByByte::new(b"abcdef".to_vec());
        let mut buf = [0u8; 6];
        read_full(&mut reader, &mut buf).unwrap();
        assert_eq!(&buf, b"abcdef");
    }

    #[test]
    fn read_full_retries_interrupted() {
        let mut reader = Interrupting::new(b"xyz".to_vec());
        let mut buf = [0u8; 3];
        read_full(&mut reader, &mut buf).unwrap();
        assert_eq!(&buf, b"xyz");
    }

    #[test]
    fn read_full_reports_progress_on_eof() {
        let mut reader = std::io::Cursor::new(b"ab".to_vec());
        let mut buf = [0u8; 5];
        let partial = read_full(&mut reader, &mut buf).unwrap_err();
        assert_eq!(partial.transferred, 2);
        assert_eq!(partial.error.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn read_full_propagates_other_errors_verbatim() {
        let mut reader = FailAfter::new(b"abc".to_vec(), ErrorKind::ConnectionReset);
        let mut buf = [0u8; 8];
        let partial = read_full(&mut reader, &mut buf).unwrap_err();
        assert_eq!(partial.transferred, 3);
        assert_eq!(partial.error.kind(), ErrorKind::ConnectionReset);
    }

    #[test]
    fn read_full_empty_buffer_reads_nothing() {
        let mut reader = FailAfter::new(Vec::new(), ErrorKind::Other);
        read_full(&mut reader, &mut []).unwrap();
    }

    #[test]
    fn write_full_loops_over_short_writes() {
        let mut sink = LimitedSink::new(64, 3);
        write_full(&mut sink, b"0123456789").unwrap();
        assert_eq!(sink.data, b"0123456789");
    }

    #[test]
    fn write_full_reports_progress_on_failure() {
        let mut sink = LimitedSink::new(4, 3);
        let partial = write_full(&mut sink, b"0123456789").unwrap_err();
        assert_eq!(partial.transferred, 4);
        assert_eq!(partial.error.kind(), ErrorKind::BrokenPipe);
    }

    #[test]
    fn write_full_zero_sink_is_write_zero() {
        struct Zero;
        impl Write for Zero {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Ok(0)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let partial = write_full(&mut Zero, b"x").unwrap_err();
        assert_eq!(partial.transferred, 0);
        assert_eq!(partial.error.kind(), ErrorKind::WriteZero);
    }
}
