//! Length-prefixed message framing over byte streams.
//!
//! Messages travel as an 8-byte big-endian length followed by the payload.
//! Payloads are opaque; readers cap accepted lengths at 1 MiB.
//!
//! # Crate Structure
//!
//! - [`frame`]: The wire format, writer, and reusable receive buffer
//! - [`transport`]: Unix socket and TCP endpoints yielding plain `Read + Write` streams

/// Re-export frame types.
pub mod frame {
    pub use prefixio_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use prefixio_transport::*;
}
