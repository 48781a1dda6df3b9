use std::path::PathBuf;

/// Errors that can occur while binding, connecting, or driving a stream.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified endpoint.
    #[error("failed to bind to {endpoint}: {source}")]
    Bind {
        endpoint: String,
        source: std::io::Error,
    },

    /// Failed to connect to the specified endpoint.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on an established stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// The endpoint string could not be parsed.
    #[error("invalid endpoint {0:?} (expected unix:<path>, tcp:<host:port>, or a socket path)")]
    InvalidEndpoint(String),

    /// The endpoint kind is not available on this platform.
    #[error("{0} endpoints are not supported on this platform")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, TransportError>;
