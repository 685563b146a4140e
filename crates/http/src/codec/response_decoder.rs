//! HTTP response decoder module
//!
//! Unlike requests, whether a response has a body depends on the request it answers
//! (`HEAD`, `CONNECT`) as well as on its status. The decoder asks an [`EmptyBodyRule`]
//! for each head; [`ResponseDecoder::decode_with`] lets the caller supply a stateful rule.

use crate::codec::header::ResponseHeadDecoder;
use crate::codec::message_decoder::MessageDecoder;
use crate::codec::{DecoderConfig, EmptyBodyRule, GenericRule};
use crate::protocol::{Message, ParseError, ResponseHeader};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// A decoder for HTTP responses.
///
/// A response with neither `Content-Length` nor `Transfer-Encoding` is read until the
/// connection closes. Used through [`Decoder`], only the status-based [`GenericRule`] applies.
#[derive(Debug)]
pub struct ResponseDecoder {
    inner: MessageDecoder<ResponseHeadDecoder>,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self { inner: MessageDecoder::new(ResponseHeadDecoder::new(config), config) }
    }

    /// Returns true when no response is partially decoded
    pub fn is_idle(&self) -> bool {
        self.inner.is_idle()
    }

    /// Decodes with `rule` deciding which responses have no body.
    pub fn decode_with<R>(&mut self, src: &mut BytesMut, rule: &mut R) -> Result<Option<Message<ResponseHeader>>, ParseError>
    where
        R: EmptyBodyRule<ResponseHeader> + ?Sized,
    {
        self.inner.decode_with(src, rule)
    }

    pub fn decode_eof_with<R>(
        &mut self,
        src: &mut BytesMut,
        rule: &mut R,
    ) -> Result<Option<Message<ResponseHeader>>, ParseError>
    where
        R: EmptyBodyRule<ResponseHeader> + ?Sized,
    {
        self.inner.decode_eof_with(src, rule)
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::with_config(DecoderConfig::default())
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<ResponseHeader>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.inner.decode_with(src, &mut GenericRule)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.inner.decode_eof_with(src, &mut GenericRule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use indoc::indoc;

    struct AlwaysEmpty;

    impl EmptyBodyRule<ResponseHeader> for AlwaysEmpty {
        fn is_content_always_empty(&mut self, _head: &ResponseHeader) -> bool {
            true
        }
    }

    #[test]
    fn not_modified_ignores_content_length() {
        let str = indoc! {r##"
        HTTP/1.1 304 Not Modified
        Content-Length: 100

        "##};

        let mut buf = BytesMut::from(str);
        let mut decoder = ResponseDecoder::new();

        let Some(Message::Header(head)) = decoder.decode(&mut buf).unwrap() else { panic!("expected a head") };
        assert_eq!(head.status(), StatusCode::NOT_MODIFIED);
        let last = decoder.decode(&mut buf).unwrap().unwrap();
        assert!(last.is_last());
        assert_eq!(last.into_payload_item().unwrap().len(), 0);
    }

    #[test]
    fn rule_overrides_framing() {
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\nHTTP/1.1 200 OK\r\n"[..]);
        let mut decoder = ResponseDecoder::new();

        assert!(decoder.decode_with(&mut buf, &mut AlwaysEmpty).unwrap().unwrap().is_header());
        assert!(decoder.decode_with(&mut buf, &mut AlwaysEmpty).unwrap().unwrap().is_last());
        assert!(decoder.is_idle());
        assert!(buf.starts_with(b"HTTP/1.1 200 OK"));
    }

    #[test]
    fn body_until_close() {
        let mut buf = BytesMut::from(&b"HTTP/1.0 200 OK\r\n\r\npart one"[..]);
        let mut decoder = ResponseDecoder::new();

        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_header());
        let chunk = decoder.decode(&mut buf).unwrap().unwrap().into_payload_item().unwrap();
        assert_eq!(chunk.as_bytes(), &b"part one"[..]);
        assert!(decoder.decode(&mut buf).unwrap().is_none());

        assert!(decoder.decode_eof(&mut buf).unwrap().unwrap().is_last());
        assert!(decoder.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn invalid_status_line() {
        let mut buf = BytesMut::from(&b"HTTP/1.1 abc OK\r\n\r\n"[..]);
        let message = ResponseDecoder::new().decode(&mut buf).unwrap().unwrap();
        assert!(message.is_failure());
    }
}
