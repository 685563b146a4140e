//! HTTP message encoder for requests and responses.
//!
//! The encoder writes a head, then routes payload items through the [`PayloadEncoder`]
//! matching the framing that head announces, until the last item has been written.

use std::marker::PhantomData;

use crate::codec::body::PayloadEncoder;
use crate::codec::framing::encode_payload_size;
use crate::codec::header::HeaderEncoder;
use crate::protocol::{HttpHead, Message, PayloadSize, RequestHeader, ResponseHeader, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::error;

/// Encodes `Message<H>` items back to bytes.
///
/// The framing is taken from the head's own `Content-Length` / `Transfer-Encoding`
/// headers; use [`set_payload_size`](crate::codec::set_payload_size) beforehand to choose
/// it, or [`MessageEncoder::encode_head`] to force one.
#[derive(Debug)]
pub struct MessageEncoder<H> {
    header_encoder: HeaderEncoder,
    payload_encoder: Option<PayloadEncoder>,
    _head: PhantomData<fn(H)>,
}

pub type RequestEncoder = MessageEncoder<RequestHeader>;
pub type ResponseEncoder = MessageEncoder<ResponseHeader>;

impl<H> MessageEncoder<H> {
    pub fn new() -> Self {
        Self { header_encoder: HeaderEncoder, payload_encoder: None, _head: PhantomData }
    }

    /// Returns true when no message is partially written
    pub fn is_idle(&self) -> bool {
        self.payload_encoder.is_none()
    }
}

impl<H> Default for MessageEncoder<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> MessageEncoder<H>
where
    HeaderEncoder: Encoder<H, Error = SendError>,
{
    /// Writes `head` as-is and frames the following payload items as `payload_size`.
    pub fn encode_head(&mut self, head: H, payload_size: PayloadSize, dst: &mut BytesMut) -> Result<(), SendError> {
        if self.payload_encoder.is_some() {
            error!("expect payload item but receive message head");
            return Err(SendError::unexpected_item("message head while the previous payload is unfinished"));
        }

        self.payload_encoder = Some(payload_size.into());
        self.header_encoder.encode(head, dst)
    }
}

impl<H, D> Encoder<Message<H, D>> for MessageEncoder<H>
where
    H: HttpHead,
    D: Buf,
    HeaderEncoder: Encoder<H, Error = SendError>,
{
    type Error = SendError;

    fn encode(&mut self, item: Message<H, D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header(head) => {
                let payload_size = encode_payload_size(&head);
                self.encode_head(head, payload_size, dst)
            }

            Message::Payload(payload_item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    error!("expect message head but receive payload item");
                    return Err(SendError::unexpected_item("payload item without a message head"));
                };

                let result = payload_encoder.encode(payload_item, dst);

                if payload_encoder.is_finish() {
                    self.payload_encoder.take();
                }

                result
            }

            Message::Failure(_) => Err(SendError::unexpected_item("decode failures can't be encoded")),

            Message::Opaque(mut data) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive opaque bytes");
                    return Err(SendError::unexpected_item("opaque bytes while a payload is unfinished"));
                }
                while data.has_remaining() {
                    let chunk = data.chunk();
                    let n = chunk.len();
                    dst.extend_from_slice(chunk);
                    data.advance(n);
                }
                Ok(())
            }
        }
    }
}
