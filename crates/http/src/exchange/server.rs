//! Server side request/response correlation.
//!
//! The mirror image of the client side: request methods are queued as requests are
//! decoded and consumed as responses are encoded, so that a response to `HEAD` or a
//! successful `CONNECT` is written without a body.

use std::collections::VecDeque;

use bytes::{Buf, Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderValue, Method, StatusCode};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, trace, warn};

use crate::codec::{is_status_always_empty, DecoderConfig, RequestDecoder, ResponseEncoder};
use crate::protocol::{HttpError, Message, PayloadItem, PayloadSize, RequestHeader, ResponseHeader, SendError};

/// Methods of decoded requests still waiting for their response.
#[derive(Debug, Default)]
pub struct ServerExchange {
    methods: VecDeque<Method>,
}

impl ServerExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_decode_request_head(&mut self, method: &Method) {
        trace!(%method, queued = self.methods.len() + 1, "request received");
        self.methods.push_back(method.clone());
    }

    /// A response head is about to be written.
    ///
    /// Strips framing headers the response must not carry and returns the framing to
    /// force when the body is always absent; `None` leaves it to the head's headers.
    pub fn on_encode_response_head(&mut self, head: &mut ResponseHeader) -> Option<PayloadSize> {
        let status = head.status();
        let interim = status.is_informational() && status != StatusCode::SWITCHING_PROTOCOLS;
        let method = if interim { self.methods.front().cloned() } else { self.methods.pop_front() };

        if method.is_none() {
            warn!(%status, "writing a response without a pending request");
        }

        sanitize_headers(head);

        match method {
            _ if status.is_informational() => Some(PayloadSize::Empty),
            Some(Method::HEAD) => Some(PayloadSize::Empty),
            Some(Method::CONNECT) if status.is_success() => {
                debug!(%status, "tunnel response, dropping transfer-encoding");
                head.headers_mut().remove(TRANSFER_ENCODING);
                Some(PayloadSize::Empty)
            }
            _ if is_status_always_empty(status) => Some(PayloadSize::Empty),
            _ => None,
        }
    }

    pub fn pending_methods(&self) -> usize {
        self.methods.len()
    }
}

/// 1xx and 204 responses carry no framing headers; 205 announces an empty body.
fn sanitize_headers(head: &mut ResponseHeader) {
    let status = head.status();
    if status.is_informational() || status == StatusCode::NO_CONTENT {
        head.headers_mut().remove(CONTENT_LENGTH);
        head.headers_mut().remove(TRANSFER_ENCODING);
    } else if status == StatusCode::RESET_CONTENT {
        head.headers_mut().remove(TRANSFER_ENCODING);
        head.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
    }
}

/// Decodes requests and encodes the responses answering them over one connection.
#[derive(Debug)]
pub struct ServerCodec {
    decoder: RequestDecoder,
    encoder: ResponseEncoder,
    exchange: ServerExchange,
    upgraded: bool,
}

impl ServerCodec {
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            decoder: RequestDecoder::with_config(config),
            encoder: ResponseEncoder::new(),
            exchange: ServerExchange::new(),
            upgraded: false,
        }
    }

    pub fn exchange(&self) -> &ServerExchange {
        &self.exchange
    }

    /// Leaves HTTP once the last response was written: bytes pass through unparsed.
    pub fn upgrade(&mut self) {
        debug!("connection upgraded, http codec is now pass-through");
        self.upgraded = true;
    }

    pub fn is_upgraded(&self) -> bool {
        self.upgraded
    }
}

impl Default for ServerCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ServerCodec {
    type Item = Message<RequestHeader>;
    type Error = HttpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.upgraded {
            if src.is_empty() {
                return Ok(None);
            }
            return Ok(Some(Message::Opaque(src.split().freeze())));
        }

        let message = self.decoder.decode(src)?;
        if let Some(Message::Header(head)) = &message {
            self.exchange.on_decode_request_head(head.method());
        }
        Ok(message)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.upgraded {
            return self.decode(src);
        }

        let message = self.decoder.decode_eof(src)?;
        if let Some(Message::Header(head)) = &message {
            self.exchange.on_decode_request_head(head.method());
        }
        Ok(message)
    }
}

impl<D: Buf> Encoder<Message<ResponseHeader, D>> for ServerCodec {
    type Error = HttpError;

    fn encode(&mut self, item: Message<ResponseHeader, D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header(_) if self.upgraded => {
                error!("http response written after the connection was upgraded");
                Err(SendError::unexpected_item("http message on an upgraded connection").into())
            }
            Message::Header(mut head) => match self.exchange.on_encode_response_head(&mut head) {
                Some(payload_size) => Ok(self.encoder.encode_head(head, payload_size, dst)?),
                None => Ok(self.encoder.encode(Message::<_, D>::Header(head), dst)?),
            },
            item => Ok(self.encoder.encode(item, dst)?),
        }
    }
}

impl Encoder<ResponseHeader> for ServerCodec {
    type Error = HttpError;

    /// Writes a head whose body is empty, such as a synthesized interim or error reply.
    fn encode(&mut self, head: ResponseHeader, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode(Message::<_, Bytes>::Header(head), dst)?;
        self.encode(Message::<ResponseHeader>::Payload(PayloadItem::eof()), dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Response;

    fn codec_with_requests(raw: &[u8]) -> ServerCodec {
        let mut codec = ServerCodec::new();
        let mut src = BytesMut::from(raw);
        while codec.decode(&mut src).unwrap().is_some() {}
        codec
    }

    fn response(status: StatusCode, headers: &[(&str, &str)]) -> ResponseHeader {
        let mut builder = Response::builder().status(status);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into()
    }

    fn write(codec: &mut ServerCodec, head: ResponseHeader, body: &'static [u8]) -> BytesMut {
        let mut dst = BytesMut::new();
        codec.encode(Message::<_, Bytes>::Header(head), &mut dst).unwrap();
        let last = PayloadItem::Last { data: Bytes::from_static(body), trailers: Default::default() };
        codec.encode(Message::<ResponseHeader>::Payload(last), &mut dst).unwrap();
        dst
    }

    #[test]
    fn head_response_keeps_length_drops_body() {
        let mut codec = codec_with_requests(b"HEAD /index.html HTTP/1.1\r\nHost: a\r\n\r\n");
        assert_eq!(codec.exchange().pending_methods(), 1);

        let dst = write(&mut codec, response(StatusCode::OK, &[("content-length", "5")]), b"hello");
        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\ncontent-length: 5\r\n\r\n");
        assert_eq!(codec.exchange().pending_methods(), 0);
    }

    #[test]
    fn connect_response_drops_transfer_encoding() {
        let mut codec = codec_with_requests(b"CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\n\r\n");

        let dst = write(&mut codec, response(StatusCode::OK, &[("transfer-encoding", "chunked")]), b"");
        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\n\r\n");
    }

    #[test]
    fn failed_connect_keeps_its_body() {
        let mut codec = codec_with_requests(b"CONNECT example.com:443 HTTP/1.1\r\n\r\n");

        let dst = write(&mut codec, response(StatusCode::BAD_GATEWAY, &[("content-length", "2")]), b"no");
        assert!(dst.ends_with(b"\r\n\r\nno"));
    }

    #[test]
    fn interim_response_peeks_the_queue() {
        let mut codec = codec_with_requests(b"HEAD / HTTP/1.1\r\n\r\n");

        let dst = write(&mut codec, response(StatusCode::CONTINUE, &[("content-length", "3")]), b"");
        assert_eq!(&dst[..], b"HTTP/1.1 100 Continue\r\n\r\n");
        assert_eq!(codec.exchange().pending_methods(), 1);

        let dst = write(&mut codec, response(StatusCode::OK, &[("content-length", "3")]), b"abc");
        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\ncontent-length: 3\r\n\r\n");
        assert_eq!(codec.exchange().pending_methods(), 0);
    }

    #[test]
    fn reset_content_announces_empty_body() {
        let mut codec = codec_with_requests(b"POST /form HTTP/1.1\r\nContent-Length: 0\r\n\r\n");

        let dst = write(&mut codec, response(StatusCode::RESET_CONTENT, &[("transfer-encoding", "chunked")]), b"");
        assert_eq!(&dst[..], b"HTTP/1.1 205 Reset Content\r\ncontent-length: 0\r\n\r\n");
    }

    #[test]
    fn pipelined_requests_answered_in_order() {
        let mut codec = codec_with_requests(b"HEAD /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n");
        assert_eq!(codec.exchange().pending_methods(), 2);

        let dst = write(&mut codec, response(StatusCode::OK, &[("content-length", "1")]), b"x");
        assert!(dst.ends_with(b"\r\n\r\n"));
        let dst = write(&mut codec, response(StatusCode::OK, &[("content-length", "1")]), b"x");
        assert!(dst.ends_with(b"\r\n\r\nx"));
    }

    #[test]
    fn upgrade_passes_bytes_through() {
        let mut codec = codec_with_requests(b"GET /ws HTTP/1.1\r\nUpgrade: websocket\r\nConnection: upgrade\r\n\r\n");
        let dst = write(&mut codec, response(StatusCode::SWITCHING_PROTOCOLS, &[("upgrade", "websocket")]), b"");
        assert!(dst.starts_with(b"HTTP/1.1 101 Switching Protocols\r\n"));
        codec.upgrade();

        let mut src = BytesMut::from(&b"\x81\x05hello"[..]);
        let Some(Message::Opaque(data)) = codec.decode(&mut src).unwrap() else { panic!("expected opaque bytes") };
        assert_eq!(&data[..], b"\x81\x05hello");

        let mut dst = BytesMut::new();
        codec.encode(Message::<ResponseHeader>::Opaque(Bytes::from_static(b"\x81\x00")), &mut dst).unwrap();
        assert_eq!(&dst[..], b"\x81\x00");
        assert!(codec.encode(Message::<_, Bytes>::Header(response(StatusCode::OK, &[])), &mut dst).is_err());
    }
}
