use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};

/// A connected byte stream: implements `Read + Write`.
///
/// Blocking. Timeouts, when set, surface as `WouldBlock`/`TimedOut` I/O errors
/// from the read or write that hit them.
pub struct Stream {
    inner: StreamInner,
}

enum StreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Tcp(TcpStream),
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.read(buf),
            StreamInner::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.write(buf),
            StreamInner::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.flush(),
            StreamInner::Tcp(stream) => stream.flush(),
        }
    }
}

impl Stream {
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: StreamInner::Unix(stream),
        }
    }

    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: StreamInner::Tcp(stream),
        }
    }

    /// A connected pair of Unix socket streams.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }

    /// Set read timeout on the underlying stream. `None` blocks indefinitely.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.set_read_timeout(timeout)?,
            StreamInner::Tcp(stream) => stream.set_read_timeout(timeout)?,
        }
        Ok(())
    }

    /// Set write timeout on the underlying stream. `None` blocks indefinitely.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.set_write_timeout(timeout)?,
            StreamInner::Tcp(stream) => stream.set_write_timeout(timeout)?,
        }
        Ok(())
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => Self::from_unix(stream.try_clone()?),
            StreamInner::Tcp(stream) => Self::from_tcp(stream.try_clone()?),
        };
        Ok(cloned)
    }

    /// Close the write half so the peer observes end-of-stream.
    pub fn shutdown_write(&self) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.shutdown(Shutdown::Write)?,
            StreamInner::Tcp(stream) => stream.shutdown(Shutdown::Write)?,
        }
        Ok(())
    }

    /// Transport name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(_) => "unix",
            StreamInner::Tcp(_) => "tcp",
        }
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream").field("type", &self.kind()).finish()
    }
}

/// Connect to a listening endpoint (blocking).
pub fn connect(endpoint: &Endpoint) -> Result<Stream> {
    let stream = match endpoint {
        #[cfg(unix)]
        Endpoint::Unix(path) => crate::uds::connect(path)?,
        #[cfg(not(unix))]
        Endpoint::Unix(_) => return Err(TransportError::Unsupported("unix")),
        Endpoint::Tcp(addr) => {
            let stream = TcpStream::connect(addr.as_str()).map_err(|source| {
                TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                }
            })?;
            stream.set_nodelay(true)?;
            Stream::from_tcp(stream)
        }
    };
    debug!(%endpoint, "connected");
    Ok(stream)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn pair_carries_bytes_both_ways() {
        let (mut left, mut right) = Stream::pair().unwrap();
        left.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        right.write_all(b"pong").unwrap();
        left.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");
        assert_eq!(left.kind(), "unix");
    }

    #[test]
    fn shutdown_write_signals_end_of_stream() {
        let (left, mut right) = Stream::pair().unwrap();
        left.shutdown_write().unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(right.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn try_clone_shares_the_connection() {
        let (left, mut right) = Stream::pair().unwrap();
        let mut writer = left.try_clone().unwrap();
        assert_eq!(writer.kind(), left.kind());

        writer.write_all(b"via clone").unwrap();
        drop(writer);
        left.shutdown_write().unwrap();

        let mut received = Vec::new();
        right.read_to_end(&mut received).unwrap();
        assert_eq!(received, b"via clone");
    }

    #[test]
    fn read_timeout_surfaces_as_io_error() {
        let (_left, mut right) = Stream::pair().unwrap();
        right
            .set_read_timeout(Some(Duration::from_millis(10)))
            .unwrap();
        let mut buf = [0u8; 1];
        let err = right.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
        ));
    }

    #[test]
    fn connect_refused_reports_endpoint() {
        let endpoint: Endpoint = "tcp:127.0.0.1:1".parse().unwrap();
        let err = connect(&endpoint).unwrap_err();
        match err {
            TransportError::Connect { endpoint, .. } => assert_eq!(endpoint, "tcp:127.0.0.1:1"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
