use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Length prefix: one unsigned 64-bit big-endian integer.
pub const PREFIX_LEN: usize = 8;

/// Largest payload a reader accepts: 1 MiB, inclusive.
pub const MAX_LEN: usize = 1024 * 1024;

/// Encode a payload length as its wire prefix.
pub fn encode_prefix(len: u64) -> [u8; PREFIX_LEN] {
    len.to_be_bytes()
}

/// Decode a wire prefix into the declared payload length.
pub fn decode_prefix(prefix: &[u8; PREFIX_LEN]) -> u64 {
    u64::from_be_bytes(*prefix)
}

/// Validate a declared length against the read-side bound.
///
/// `max` itself is accepted. This is the only check applied to a declared
/// length.
pub fn check_declared_len(declared: u64, max: usize) -> Result<usize> {
    match usize::try_from(declared) {
        Ok(len) if len <= max => Ok(len),
        _ => Err(FrameError::MessageTooLarge {
            size: declared,
            max,
        }),
    }
}

/// Append one frame to `dst`.
///
/// Wire format:
/// ```text
/// ┌──────────────────────┬──────────────────────┐
/// │ Length (8B, u64 BE)  │ Payload (Length B)   │
/// └──────────────────────┴──────────────────────┘
/// ```
///
/// No size limit is applied on the encoding side.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(PREFIX_LEN + payload.len());
    dst.put_u64(payload.len() as u64);
    dst.put_slice(payload);
}

/// Decode one frame from the front of `src`.
///
/// Returns `Ok(None)` until a complete frame is buffered. An oversized
/// declared length is rejected as soon as the prefix is available, before
/// any payload is buffered. On success exactly one frame is consumed.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    if src.len() < PREFIX_LEN {
        return Ok(None);
    }

    let mut prefix = [0u8; PREFIX_LEN];
    prefix.copy_from_slice(&src[..PREFIX_LEN]);
    let payload_len = check_declared_len(decode_prefix(&prefix), max_payload)?;

    let total = PREFIX_LEN + payload_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(PREFIX_LEN);
    Ok(Some(src.split_to(payload_len).freeze()))
}

/// Configuration shared by [`FrameReader`](crate::FrameReader) and
/// [`FrameWriter`](crate::FrameWriter).
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum accepted payload size in bytes. Default: [`MAX_LEN`].
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_LEN,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// `tokio_util` codec over the same wire format. Items are payloads.
#[cfg(feature = "async")]
#[derive(Debug, Clone)]
pub struct PrefixCodec {
    max_payload_size: usize,
}

#[cfg(feature = "async")]
impl PrefixCodec {
    /// A codec accepting payloads up to [`MAX_LEN`].
    pub fn new() -> Self {
        Self::with_max_payload_size(MAX_LEN)
    }

    pub fn with_max_payload_size(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }
}

#[cfg(feature = "async")]
impl Default for PrefixCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "async")]
impl tokio_util::codec::Decoder for PrefixCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        decode_frame(src, self.max_payload_size)
    }
}

#[cfg(feature = "async")]
impl tokio_util::codec::Encoder<Bytes> for PrefixCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        encode_frame(&item, dst);
        Ok(())
    }
}

#[cfg(feature = "async")]
impl<'a> tokio_util::codec::Encoder<&'a [u8]> for PrefixCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &'a [u8], dst: &mut BytesMut) -> Result<()> {
        encode_frame(item, dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_big_endian() {
        assert_eq!(encode_prefix(3), [0, 0, 0, 0, 0, 0, 0, 3]);
        assert_eq!(encode_prefix(0x0102), [0, 0, 0, 0, 0, 0, 1, 2]);
        assert_eq!(decode_prefix(&[0, 0, 0, 0, 0, 0x10, 0, 0]), MAX_LEN as u64);
    }

    #[test]
    fn declared_len_boundary_is_inclusive() {
        assert_eq!(check_declared_len(0, MAX_LEN).unwrap(), 0);
        assert_eq!(check_declared_len(MAX_LEN as u64, MAX_LEN).unwrap(), MAX_LEN);

        let err = check_declared_len(MAX_LEN as u64 + 1, MAX_LEN).unwrap_err();
        assert!(matches!(
            err,
            FrameError::MessageTooLarge { size, max } if size == MAX_LEN as u64 + 1 && max == MAX_LEN
        ));

        let err = check_declared_len(u64::MAX, MAX_LEN).unwrap_err();
        assert!(matches!(err, FrameError::MessageTooLarge { size: u64::MAX, .. }));
    }

    #[test]
    fn encode_foo_matches_wire_bytes() {
        let mut buf = BytesMut::new();
        encode_frame(b"foo", &mut buf);
        assert_eq!(buf.as_ref(), b"\x00\x00\x00\x00\x00\x00\x00\x03foo");
    }

    #[test]
    fn decode_roundtrip() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello, prefixio!", &mut buf);

        let payload = decode_frame(&mut buf, MAX_LEN).unwrap().unwrap();
        assert_eq!(payload.as_ref(), b"hello, prefixio!");
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_incomplete_prefix() {
        let mut buf = BytesMut::from(&[0x00, 0x00, 0x00][..]);
        assert!(decode_frame(&mut buf, MAX_LEN).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello", &mut buf);
        buf.truncate(PREFIX_LEN + 2);

        assert!(decode_frame(&mut buf, MAX_LEN).unwrap().is_none());
        assert_eq!(buf.len(), PREFIX_LEN + 2, "partial frame must stay buffered");
    }

    #[test]
    fn decode_rejects_oversized_before_payload_arrives() {
        let mut buf = BytesMut::new();
        buf.put_u64(MAX_LEN as u64 + 1);

        let result = decode_frame(&mut buf, MAX_LEN);
        assert!(matches!(result, Err(FrameError::MessageTooLarge { .. })));
    }

    #[test]
    fn decode_respects_custom_max() {
        let mut buf = BytesMut::new();
        encode_frame(b"12345", &mut buf);
        let result = decode_frame(&mut buf, 4);
        assert!(matches!(
            result,
            Err(FrameError::MessageTooLarge { size: 5, max: 4 })
        ));
    }

    #[test]
    fn multiple_frames() {
        let mut buf = BytesMut::new();
        encode_frame(b"first", &mut buf);
        encode_frame(b"", &mut buf);
        encode_frame(b"third", &mut buf);

        let f1 = decode_frame(&mut buf, MAX_LEN).unwrap().unwrap();
        let f2 = decode_frame(&mut buf, MAX_LEN).unwrap().unwrap();
        let f3 = decode_frame(&mut buf, MAX_LEN).unwrap().unwrap();

        assert_eq!(f1.as_ref(), b"first");
        assert!(f2.is_empty());
        assert_eq!(f3.as_ref(), b"third");
        assert!(buf.is_empty());
    }

    #[test]
    fn empty_payload_is_prefix_only() {
        let mut buf = BytesMut::new();
        encode_frame(b"", &mut buf);
        assert_eq!(buf.as_ref(), &[0u8; PREFIX_LEN]);
    }

    #[cfg(feature = "async")]
    mod codec {
        use futures_util::{SinkExt, StreamExt};
        use tokio_util::codec::{FramedRead, FramedWrite};

        use super::super::*;

        #[tokio::test]
        async fn framed_roundtrip_over_duplex() {
            let (client, server) = tokio::io::duplex(64);
            let mut sink = FramedWrite::new(client, PrefixCodec::new());
            let mut stream = FramedRead::new(server, PrefixCodec::new());

            let writer = tokio::spawn(async move {
                sink.send(Bytes::from_static(b"foobarbaz")).await.unwrap();
                sink.send(Bytes::new()).await.unwrap();
                sink.send(Bytes::from_static(b"f")).await.unwrap();
            });

            let mut received = Vec::new();
            while let Some(frame) = stream.next().await {
                received.push(frame.unwrap());
            }
            writer.await.unwrap();

            assert_eq!(received.len(), 3);
            assert_eq!(received[0].as_ref(), b"foobarbaz");
            assert!(received[1].is_empty());
            assert_eq!(received[2].as_ref(), b"f");
        }

        #[tokio::test]
        async fn framed_read_rejects_oversized() {
            let mut wire = BytesMut::new();
            wire.put_u64(1024);
            let mut stream = FramedRead::new(&wire[..], PrefixCodec::with_max_payload_size(16));

            let err = stream.next().await.unwrap().unwrap_err();
            assert!(matches!(err, FrameError::MessageTooLarge { size: 1024, max: 16 }));
        }

        #[tokio::test]
        async fn framed_read_truncated_stream_errors() {
            let mut wire = BytesMut::new();
            encode_frame(b"hello", &mut wire);
            wire.truncate(PREFIX_LEN + 2);
            let mut stream = FramedRead::new(&wire[..], PrefixCodec::new());

            let err = stream.next().await.unwrap().unwrap_err();
            assert!(matches!(err, FrameError::Io(_)));
        }
    }
}
