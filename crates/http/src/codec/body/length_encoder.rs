use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

/// Writes a body announced by `Content-Length`, refusing to write more or fewer bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    length: u64,
    finished: bool,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { length, finished: false }
    }

    pub fn is_finish(&self) -> bool {
        self.finished
    }

    fn write<D: Buf>(&mut self, mut bytes: D, dst: &mut BytesMut) -> Result<(), SendError> {
        let len = bytes.remaining() as u64;
        if len > self.length {
            warn!(len, remaining = self.length, "payload exceeds content-length");
            return Err(SendError::invalid_body(format!("{len} bytes exceed the remaining content-length {}", self.length)));
        }

        dst.reserve(bytes.remaining());
        while bytes.has_remaining() {
            let chunk = bytes.chunk();
            let n = chunk.len();
            dst.extend_from_slice(chunk);
            bytes.advance(n);
        }
        self.length -= len;
        Ok(())
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.finished {
            return Err(SendError::unexpected_item("payload item after the last chunk"));
        }

        match item {
            PayloadItem::Chunk(bytes) => self.write(bytes, dst),
            PayloadItem::Last { data, .. } => {
                self.write(data, dst)?;
                self.finished = true;
                if self.length > 0 {
                    return Err(SendError::invalid_body(format!("body is {} bytes shorter than content-length", self.length)));
                }
                Ok(())
            }
        }
    }
}
