//! Stream endpoints for prefixio.
//!
//! Framing works over any `Read`/`Write` pair. This crate supplies the
//! concrete ones the CLI and tests use:
//! - Unix domain sockets (Linux/macOS)
//! - TCP
//!
//! Both are surfaced as a single [`Stream`] type.

pub mod endpoint;
pub mod error;
pub mod listener;
pub mod stream;

#[cfg(unix)]
mod uds;

pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use listener::Listener;
pub use stream::{connect, Stream};
