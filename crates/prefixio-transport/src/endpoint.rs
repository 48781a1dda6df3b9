use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TransportError;

const UNIX_SCHEME: &str = "unix:";
const TCP_SCHEME: &str = "tcp:";

/// Where a stream lives.
///
/// Parsed from `unix:<path>`, `tcp:<host:port>`, or a bare path, which is
/// taken as a Unix socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Unix(PathBuf),
    Tcp(String),
}

impl Endpoint {
    /// Short transport name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Endpoint::Unix(_) => "unix",
            Endpoint::Tcp(_) => "tcp",
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix(UNIX_SCHEME) {
            if path.is_empty() {
                return Err(TransportError::InvalidEndpoint(s.to_string()));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        if let Some(addr) = s.strip_prefix(TCP_SCHEME) {
            // host:port, where host may be empty only for wildcard binds like ":0"
            match addr.rsplit_once(':') {
                Some((_, port)) if !port.is_empty() && port.parse::<u16>().is_ok() => {
                    return Ok(Endpoint::Tcp(addr.to_string()));
                }
                _ => return Err(TransportError::InvalidEndpoint(s.to_string())),
            }
        }
        if s.is_empty() || s.contains("://") {
            return Err(TransportError::InvalidEndpoint(s.to_string()));
        }
        Ok(Endpoint::Unix(PathBuf::from(s)))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "{UNIX_SCHEME}{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "{TCP_SCHEME}{addr}"),
        }
    }
}
