use std::net::TcpListener;

use tracing::{debug, info};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::stream::Stream;

/// A bound endpoint accepting connections one at a time.
pub struct Listener {
    inner: ListenerInner,
}

enum ListenerInner {
    #[cfg(unix)]
    Unix(crate::uds::UnixSocketListener),
    Tcp(TcpListener),
}

impl Listener {
    /// Bind and listen on `endpoint`.
    ///
    /// Unix sockets are created with mode `0600`. A stale socket at the same
    /// path is removed first; any other existing file is left alone and the
    /// bind fails.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        let inner = match endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => ListenerInner::Unix(crate::uds::UnixSocketListener::bind(path)?),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => return Err(TransportError::Unsupported("unix")),
            Endpoint::Tcp(addr) => {
                let listener =
                    TcpListener::bind(addr.as_str()).map_err(|source| TransportError::Bind {
                        endpoint: endpoint.to_string(),
                        source,
                    })?;
                ListenerInner::Tcp(listener)
            }
        };
        let listener = Self { inner };
        info!(endpoint = %listener.local_endpoint()?, "listening");
        Ok(listener)
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<Stream> {
        let stream = match &self.inner {
            #[cfg(unix)]
            ListenerInner::Unix(listener) => listener.accept()?,
            ListenerInner::Tcp(listener) => {
                let (stream, peer) = listener.accept().map_err(TransportError::Accept)?;
                stream.set_nodelay(true)?;
                debug!(%peer, "accepted tcp connection");
                Stream::from_tcp(stream)
            }
        };
        Ok(stream)
    }

    /// The endpoint actually bound. For `tcp:<host>:0` this carries the
    /// port the OS assigned.
    pub fn local_endpoint(&self) -> Result<Endpoint> {
        match &self.inner {
            #[cfg(unix)]
            ListenerInner::Unix(listener) => Ok(Endpoint::Unix(listener.path().to_path_buf())),
            ListenerInner::Tcp(listener) => Ok(Endpoint::Tcp(listener.local_addr()?.to_string())),
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            #[cfg(unix)]
            ListenerInner::Unix(_) => "unix",
            ListenerInner::Tcp(_) => "tcp",
        };
        f.debug_struct("Listener").field("type", &kind).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::connect;
    use std::io::{Read, Write};

    #[test]
    fn tcp_bind_accept_connect() {
        let listener = Listener::bind(&"tcp:127.0.0.1:0".parse().unwrap()).unwrap();
        let endpoint = listener.local_endpoint().unwrap();
        assert!(matches!(&endpoint, Endpoint::Tcp(addr) if !addr.ends_with(":0")));

        let handle = std::thread::spawn(move || {
            let mut client = connect(&endpoint).unwrap();
            client.write_all(b"hello").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
        assert_eq!(server.kind(), "tcp");

        handle.join().unwrap();
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::path::PathBuf;

        fn temp_dir(tag: &str) -> PathBuf {
            let dir = std::env::temp_dir().join(format!("prefixio-{tag}-{}", std::process::id()));
            std::fs::create_dir_all(&dir).unwrap();
            dir
        }

        #[test]
        fn bind_accept_connect_and_cleanup() {
            let dir = temp_dir("uds");
            let sock_path = dir.join("test.sock");
            let endpoint = Endpoint::Unix(sock_path.clone());

            let listener = Listener::bind(&endpoint).unwrap();
            assert!(sock_path.exists());
            assert_eq!(listener.local_endpoint().unwrap(), endpoint);

            let handle = std::thread::spawn(move || {
                let mut client = connect(&endpoint).unwrap();
                client.write_all(b"hello").unwrap();
            });

            let mut server = listener.accept().unwrap();
            let mut buf = [0u8; 5];
            server.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"hello");
            handle.join().unwrap();

            drop(listener);
            assert!(!sock_path.exists(), "socket file should be removed on drop");
            let _ = std::fs::remove_dir_all(&dir);
        }

        #[test]
        fn path_too_long() {
            let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
            let result = Listener::bind(&Endpoint::Unix(long_path.into()));
            assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
        }

        #[test]
        fn socket_mode_is_owner_only() {
            let dir = temp_dir("perms");
            let sock_path = dir.join("perm.sock");

            let listener = Listener::bind(&Endpoint::Unix(sock_path.clone())).unwrap();
            let mode = std::fs::metadata(&sock_path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, crate::uds::SOCKET_MODE);

            drop(listener);
            let _ = std::fs::remove_dir_all(&dir);
        }

        #[test]
        fn stale_socket_is_replaced() {
            let dir = temp_dir("stale");
            let sock_path = dir.join("stale.sock");
            let first = std::os::unix::net::UnixListener::bind(&sock_path).unwrap();
            drop(first);
            assert!(sock_path.exists());

            let listener = Listener::bind(&Endpoint::Unix(sock_path.clone()));
            assert!(listener.is_ok());

            drop(listener);
            let _ = std::fs::remove_dir_all(&dir);
        }

        #[test]
        fn refuses_to_clobber_regular_file() {
            let dir = temp_dir("regular");
            let sock_path = dir.join("not-a-socket.sock");
            std::fs::write(&sock_path, b"keep me").unwrap();

            let result = Listener::bind(&Endpoint::Unix(sock_path.clone()));
            assert!(matches!(result, Err(TransportError::Bind { .. })));
            assert_eq!(std::fs::read(&sock_path).unwrap(), b"keep me");

            let _ = std::fs::remove_dir_all(&dir);
        }

        #[test]
        fn drop_leaves_replaced_path_alone() {
            let dir = temp_dir("replaced");
            let sock_path = dir.join("drop.sock");

            let listener = Listener::bind(&Endpoint::Unix(sock_path.clone())).unwrap();
            std::fs::remove_file(&sock_path).unwrap();
            std::fs::write(&sock_path, b"replacement").unwrap();

            drop(listener);
            assert!(sock_path.exists());

            let _ = std::fs::remove_dir_all(&dir);
        }
    }
}
