//! A codec adapter running a [`MessageAggregator`] over the messages of an inner codec.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::aggregate::{AggregateAll, Aggregated, AggregationPredicate, AggregatorConfig, MessageAggregator};
use crate::protocol::{HttpError, HttpHead, Message};

/// Wraps a codec decoding `Message<T>` so that it decodes [`Aggregated<T>`] instead.
///
/// Encoding is delegated to the inner codec untouched.
#[derive(Debug)]
pub struct AggregatedCodec<C, T, P = AggregateAll> {
    inner: C,
    aggregator: MessageAggregator<T, P>,
}

impl<C, T: HttpHead> AggregatedCodec<C, T> {
    pub fn new(inner: C, config: AggregatorConfig) -> Self {
        Self { inner, aggregator: MessageAggregator::new(config) }
    }
}

impl<C, T, P> AggregatedCodec<C, T, P>
where
    T: HttpHead,
    P: AggregationPredicate<T>,
{
    pub fn with_predicate(inner: C, config: AggregatorConfig, predicate: P) -> Self {
        Self { inner, aggregator: MessageAggregator::with_predicate(config, predicate) }
    }

    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    pub fn aggregator(&self) -> &MessageAggregator<T, P> {
        &self.aggregator
    }
}

impl<C, T, P> Decoder for AggregatedCodec<C, T, P>
where
    C: Decoder<Item = Message<T>>,
    C::Error: Into<HttpError>,
    T: HttpHead,
    P: AggregationPredicate<T>,
{
    type Item = Aggregated<T>;
    type Error = HttpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(message) = self.inner.decode(src).map_err(Into::into)? else {
                return Ok(None);
            };
            if let Some(aggregated) = self.aggregator.on_message(message)? {
                return Ok(Some(aggregated));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let message = match self.inner.decode_eof(src) {
                Ok(Some(message)) => message,
                Ok(None) => {
                    self.aggregator.on_connection_closed();
                    return Ok(None);
                }
                Err(e) => {
                    self.aggregator.on_connection_closed();
                    return Err(e.into());
                }
            };
            if let Some(aggregated) = self.aggregator.on_message(message)? {
                return Ok(Some(aggregated));
            }
        }
    }
}

impl<C, T, P, I> Encoder<I> for AggregatedCodec<C, T, P>
where
    C: Encoder<I>,
{
    type Error = C::Error;

    fn encode(&mut self, item: I, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.inner.encode(item, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RequestDecoder;
    use crate::protocol::RequestHeader;
    use http::StatusCode;
    use indoc::indoc;

    fn codec(max: usize) -> AggregatedCodec<RequestDecoder, RequestHeader> {
        AggregatedCodec::new(RequestDecoder::new(), AggregatorConfig::new(max).unwrap())
    }

    #[test]
    fn decode_full_chunked_request() {
        let mut buf = BytesMut::from(
            &b"POST /upload HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n4\r\ntest\r\n4\r\ntest\r\n0\r\n\r\n"[..],
        );
        let mut codec = codec(1024 * 1024);

        let Some(Aggregated::Message(full)) = codec.decode(&mut buf).unwrap() else { panic!("expected a message") };
        assert_eq!(full.content_length(), 8);
        assert_eq!(full.head().headers().get("content-length").unwrap(), "8");
        assert!(full.head().headers().get("transfer-encoding").is_none());
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn continue_reply_comes_first() {
        let str = indoc! {r##"
        PUT /upload HTTP/1.1
        Expect: 100-continue
        Content-Length: 5

        "##};
        let mut buf = BytesMut::from(str);
        let mut codec = codec(16);

        let Some(Aggregated::Reply(reply)) = codec.decode(&mut buf).unwrap() else { panic!("expected a reply") };
        assert_eq!(reply.status(), StatusCode::CONTINUE);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"hello");
        let Some(Aggregated::Message(full)) = codec.decode(&mut buf).unwrap() else { panic!("expected a message") };
        assert_eq!(&full.body()[..], b"hello");
    }

    #[test]
    fn failure_becomes_marked_message() {
        let mut buf = BytesMut::from(&b"POST / HTTP/1.1\r\nContent-Length: 1, 2\r\n\r\n"[..]);
        let Some(Aggregated::Message(full)) = codec(16).decode(&mut buf).unwrap() else {
            panic!("expected a message")
        };
        assert!(full.is_failure());
    }

    #[test]
    fn eof_mid_body_yields_failed_message() {
        let mut buf = BytesMut::from(&b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc"[..]);
        let mut codec = codec(16);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        let Some(Aggregated::Message(full)) = codec.decode_eof(&mut buf).unwrap() else {
            panic!("expected a message")
        };
        assert!(full.is_failure());
        assert!(codec.aggregator().is_closed());
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }
}
