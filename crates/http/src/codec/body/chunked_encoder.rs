//! Encoder for HTTP chunked transfer encoding, including the trailer section.

use crate::codec::header::FastWrite;
use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BufMut, BytesMut};
use http::HeaderMap;
use std::io::Write;

use tokio_util::codec::Encoder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self { eof: false }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            return Err(SendError::unexpected_item("payload item after the last chunk"));
        }

        match item {
            PayloadItem::Chunk(bytes) => {
                write_chunk(bytes, dst)?;
                Ok(())
            }
            PayloadItem::Last { data, trailers } => {
                self.eof = true;
                write_chunk(data, dst)?;
                dst.extend_from_slice(b"0\r\n");
                write_trailers(&trailers, dst);
                dst.extend_from_slice(b"\r\n");
                Ok(())
            }
        }
    }
}

/// An empty chunk would read as the terminator, so it is skipped.
fn write_chunk<D: Buf>(mut bytes: D, dst: &mut BytesMut) -> Result<(), SendError> {
    if !bytes.has_remaining() {
        return Ok(());
    }
    write!(FastWrite(dst), "{:X}\r\n", bytes.remaining())?;
    dst.reserve(bytes.remaining() + 2);
    while bytes.has_remaining() {
        let chunk = bytes.chunk();
        let len = chunk.len();
        dst.extend_from_slice(chunk);
        bytes.advance(len);
    }
    dst.extend_from_slice(b"\r\n");
    Ok(())
}

fn write_trailers(trailers: &HeaderMap, dst: &mut BytesMut) {
    for (name, value) in trailers {
        dst.put_slice(name.as_ref());
        dst.put_slice(b": ");
        dst.put_slice(value.as_ref());
        dst.put_slice(b"\r\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::HeaderValue;

    #[test]
    fn chunks_then_terminator() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hello world!")), &mut dst).unwrap();
        encoder.encode(PayloadItem::Chunk(Bytes::new()), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::eof(), &mut dst).unwrap();

        assert!(encoder.is_finish());
        assert_eq!(&dst[..], b"C\r\nhello world!\r\n0\r\n\r\n");
    }

    #[test]
    fn last_with_data_and_trailers() {
        let mut trailers = HeaderMap::new();
        trailers.insert("x-checksum", HeaderValue::from_static("abc"));

        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();
        encoder
            .encode(PayloadItem::Last { data: Bytes::from_static(b"tail"), trailers }, &mut dst)
            .unwrap();

        assert_eq!(&dst[..], b"4\r\ntail\r\n0\r\nx-checksum: abc\r\n\r\n");
        assert!(encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"late")), &mut dst).is_err());
    }
}
