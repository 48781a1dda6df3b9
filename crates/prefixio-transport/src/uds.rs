use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::Stream;

/// Permission mode for created socket paths.
pub(crate) const SOCKET_MODE: u32 = 0o600;

/// `sockaddr_un.sun_path` is 108 bytes on Linux, 104 on macOS and the BSDs.
#[cfg(target_os = "linux")]
const MAX_PATH_LEN: usize = 108;
#[cfg(not(target_os = "linux"))]
const MAX_PATH_LEN: usize = 104;

/// A bound filesystem socket. Removes its path on drop, but only if the
/// path still refers to the socket this listener created.
pub(crate) struct UnixSocketListener {
    listener: UnixListener,
    path: PathBuf,
    identity: (u64, u64),
}

impl UnixSocketListener {
    pub(crate) fn bind(path: &Path) -> Result<Self> {
        let len = path.as_os_str().len();
        if len >= MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path: path.to_path_buf(),
                len,
                max: MAX_PATH_LEN,
            });
        }

        let bind_err = |source: std::io::Error| TransportError::Bind {
            endpoint: format!("unix:{}", path.display()),
            source,
        };

        remove_stale_socket(path).map_err(bind_err)?;
        let listener = UnixListener::bind(path).map_err(bind_err)?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(SOCKET_MODE))
            .map_err(bind_err)?;
        let metadata = std::fs::symlink_metadata(path).map_err(bind_err)?;

        Ok(Self {
            listener,
            path: path.to_path_buf(),
            identity: (metadata.dev(), metadata.ino()),
        })
    }

    pub(crate) fn accept(&self) -> Result<Stream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        Ok(Stream::from_unix(stream))
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixSocketListener {
    fn drop(&mut self) {
        let Ok(metadata) = std::fs::symlink_metadata(&self.path) else {
            return;
        };
        if metadata.file_type().is_socket() && (metadata.dev(), metadata.ino()) == self.identity {
            debug!(path = ?self.path, "removing socket file");
            let _ = std::fs::remove_file(&self.path);
        } else {
            debug!(path = ?self.path, "socket path replaced; leaving it in place");
        }
    }
}

/// Removes a leftover socket at `path`. Any other kind of file is refused.
fn remove_stale_socket(path: &Path) -> std::io::Result<()> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    if !metadata.file_type().is_socket() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "existing path is not a unix socket",
        ));
    }
    debug!(?path, "removing stale socket");
    std::fs::remove_file(path)
}

pub(crate) fn connect(path: &Path) -> Result<Stream> {
    let stream = UnixStream::connect(path).map_err(|source| TransportError::Connect {
        endpoint: format!("unix:{}", path.display()),
        source,
    })?;
    Ok(Stream::from_unix(stream))
}
