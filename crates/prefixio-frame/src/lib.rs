//! Length-prefixed message framing over byte streams.
//!
//! Every message is sent as an 8-byte big-endian unsigned length followed by
//! exactly that many opaque payload bytes. A length of zero is an empty
//! message. Readers refuse declared lengths above [`MAX_LEN`] (1 MiB) so a
//! corrupt or hostile prefix cannot force a huge allocation; writers apply no
//! limit.
//!
//! - [`write_bytes`] writes one frame to any `Write`.
//! - [`ReceiveBuffer`] reads frames from any `Read` into reused storage.
//! - [`FrameReader`]/[`FrameWriter`] own a stream and do both.

pub mod buffer;
pub mod codec;
pub mod error;
mod io;
pub mod reader;
pub mod writer;

pub use buffer::ReceiveBuffer;
#[cfg(feature = "async")]
pub use codec::PrefixCodec;
pub use codec::{
    check_declared_len, decode_frame, decode_prefix, encode_frame, encode_prefix, FrameConfig,
    MAX_LEN, PREFIX_LEN,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
#[cfg(feature = "async")]
pub use writer::write_bytes_async;
pub use writer::{write_bytes, FrameWriter};
