//! Decoder for bodies delimited by `Content-Length`,
//! [RFC 7230 Section 3.3.2](https://tools.ietf.org/html/rfc7230#section-3.3.2).

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Hands out at most `length` bytes as chunks, then the last item.
///
/// Bytes past the declared length are left in the buffer for the next message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    remaining: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }

    /// Bytes still expected before the payload is complete
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining == 0 {
            return Ok(Some(PayloadItem::eof()));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let len = usize::try_from(self.remaining).map_or(src.len(), |remaining| remaining.min(src.len()));
        self.remaining -= len as u64;
        Ok(Some(PayloadItem::Chunk(src.split_to(len).freeze())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_declared_length() {
        let mut buffer = BytesMut::from(&b"1012345678GET / HTTP/1.1\r\n"[..]);
        let mut decoder = LengthDecoder::new(10);

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(chunk.is_chunk());
        assert_eq!(&chunk.as_bytes()[..], b"1012345678");
        assert_eq!(&buffer[..], b"GET / HTTP/1.1\r\n");

        assert_eq!(decoder.remaining(), 0);
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_last());
    }

    #[test]
    fn split_across_reads() {
        let mut buffer = BytesMut::from(&b"hel"[..]);
        let mut decoder = LengthDecoder::new(5);

        assert_eq!(decoder.decode(&mut buffer).unwrap().unwrap().as_bytes(), &b"hel"[..]);
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
        assert_eq!(decoder.remaining(), 2);

        buffer.extend_from_slice(b"lo");
        assert_eq!(decoder.decode(&mut buffer).unwrap().unwrap().as_bytes(), &b"lo"[..]);
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_last());
    }
}
