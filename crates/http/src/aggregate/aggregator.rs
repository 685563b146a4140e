//! Accumulation of framing events into complete messages.

use std::mem;

use http::HeaderMap;
use tracing::{debug, error, trace, warn};

use crate::aggregate::buffer::ContentBuffer;
use crate::aggregate::{Admission, AggregateAll, AggregationPredicate, AggregatorConfig, ContinuationGate, Reply};
use crate::codec::set_payload_size;
use crate::protocol::{
    AggregateError, DecodeFailure, Expectation, FullMessage, HeadKind, HttpHead, Message, PayloadItem, PayloadSize,
};

/// What the aggregator hands downstream for the events it was fed.
#[derive(Debug)]
pub enum Aggregated<T> {
    /// A complete message, possibly carrying a decode failure
    Message(FullMessage<T>),
    /// An event of a message the predicate chose not to aggregate, or opaque bytes.
    ///
    /// A decode failure without a readable head has nothing to build a [`FullMessage`]
    /// from and is forwarded here as [`Message::Failure`], whatever the predicate says.
    Forward(Message<T>),
    /// A response to write back to the peer before anything else
    Reply(Reply),
}

/// Turns `Header, Chunk*, Last` sequences into [`FullMessage`]s, one message at a time.
///
/// Each head is first offered to the [`AggregationPredicate`]; messages it declines
/// are forwarded event by event. Accepted heads go through the [`ContinuationGate`],
/// then their chunks are buffered until the last one arrives or the running total
/// passes the limit. Buffered chunks are released on every path that doesn't emit them.
///
/// Errors returned by [`MessageAggregator::on_message`] are connection-fatal; after one,
/// every further event fails with [`AggregateError::ChannelClosed`].
#[derive(Debug)]
pub struct MessageAggregator<T, P = AggregateAll> {
    config: AggregatorConfig,
    gate: ContinuationGate,
    predicate: P,
    state: State<T>,
}

#[derive(Debug)]
enum State<T> {
    Idle,
    Accumulating { head: T, content: ContentBuffer, expect_continue: bool },
    Bypass,
    /// Dropping the rest of a rejected message
    Discarding,
    Closed,
}

impl<T: HttpHead> MessageAggregator<T> {
    pub fn new(config: AggregatorConfig) -> Self {
        Self::with_predicate(config, AggregateAll)
    }
}

impl<T, P> MessageAggregator<T, P>
where
    T: HttpHead,
    P: AggregationPredicate<T>,
{
    pub fn with_predicate(config: AggregatorConfig, predicate: P) -> Self {
        Self { config, gate: ContinuationGate::new(config), predicate, state: State::Idle }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Returns true between messages
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Returns true once a closing reply or a fatal error ended the connection
    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Feeds one framing event and returns what, if anything, is ready downstream.
    pub fn on_message(&mut self, message: Message<T>) -> Result<Option<Aggregated<T>>, AggregateError> {
        if self.is_closed() {
            error!("received a message on a closed channel");
            return Err(AggregateError::ChannelClosed);
        }

        match message {
            Message::Header(head) => self.on_head(head),
            Message::Payload(item) => self.on_payload(item),
            Message::Failure(failure) => self.on_failure(failure),
            Message::Opaque(data) => Ok(Some(Aggregated::Forward(Message::Opaque(data)))),
        }
    }

    /// Releases whatever is in flight; the aggregator accepts nothing afterwards.
    pub fn on_connection_closed(&mut self) {
        if let State::Accumulating { content, .. } = mem::replace(&mut self.state, State::Closed) {
            debug!(len = content.len(), "connection closed while aggregating a message");
        }
    }

    fn on_head(&mut self, mut head: T) -> Result<Option<Aggregated<T>>, AggregateError> {
        if !self.is_idle() {
            // dropping the old state releases any buffered content
            self.state = State::Closed;
            error!("received a message head while the previous message is still in flight");
            return Err(AggregateError::UnexpectedHead);
        }

        if !self.predicate.should_aggregate(&head) {
            trace!("forwarding message without aggregation");
            self.state = State::Bypass;
            return Ok(Some(Aggregated::Forward(Message::Header(head))));
        }

        let expect_continue = head.expectation() == Expectation::Continue;
        match self.gate.inspect(&mut head) {
            Ok(Admission::Admit) => {
                self.state = State::Accumulating { head, content: ContentBuffer::new(), expect_continue };
                Ok(None)
            }
            Ok(Admission::Continue(reply)) => {
                self.state = State::Accumulating { head, content: ContentBuffer::new(), expect_continue };
                Ok(Some(Aggregated::Reply(reply)))
            }
            Ok(Admission::Reject(reply)) => {
                self.state = if reply.is_close() { State::Closed } else { State::Discarding };
                Ok(Some(Aggregated::Reply(reply)))
            }
            Err(e) => {
                self.state = State::Closed;
                Err(e)
            }
        }
    }

    fn on_payload(&mut self, item: PayloadItem) -> Result<Option<Aggregated<T>>, AggregateError> {
        let is_last = item.is_last();

        match mem::replace(&mut self.state, State::Idle) {
            State::Idle => {
                warn!(len = item.len(), "payload without a message head, forwarding");
                Ok(Some(Aggregated::Forward(Message::Payload(item))))
            }

            State::Bypass => {
                if !is_last {
                    self.state = State::Bypass;
                }
                Ok(Some(Aggregated::Forward(Message::Payload(item))))
            }

            State::Discarding => {
                trace!(len = item.len(), "discarding payload of a rejected message");
                if !is_last {
                    self.state = State::Discarding;
                }
                Ok(None)
            }

            State::Accumulating { head, mut content, expect_continue } => {
                let (data, trailers) = match item {
                    PayloadItem::Chunk(data) => (data, None),
                    PayloadItem::Last { data, trailers } => (data, Some(trailers)),
                };

                let total = content.push(data);
                if self.config.exceeds(total) {
                    drop(content);
                    return self.on_overflow(&head, total, expect_continue, is_last);
                }

                match trailers {
                    None => {
                        self.state = State::Accumulating { head, content, expect_continue };
                        Ok(None)
                    }
                    Some(trailers) => Ok(Some(Aggregated::Message(finish(head, content, trailers)))),
                }
            }

            State::Closed => {
                self.state = State::Closed;
                Err(AggregateError::ChannelClosed)
            }
        }
    }

    /// The running total passed the limit after the head was admitted.
    fn on_overflow(
        &mut self,
        head: &T,
        total: u64,
        expect_continue: bool,
        is_last: bool,
    ) -> Result<Option<Aggregated<T>>, AggregateError> {
        let limit = self.config.max_content_length();

        match T::KIND {
            HeadKind::Request => {
                let close = self.gate.close_on_too_large(head.is_keep_alive(), expect_continue);
                warn!(total, %limit, close, "content length exceeded while aggregating, replying 413");
                self.state = match (close, is_last) {
                    (true, _) => State::Closed,
                    (false, true) => State::Idle,
                    (false, false) => State::Discarding,
                };
                Ok(Some(Aggregated::Reply(Reply::too_large(close))))
            }
            HeadKind::Response => {
                error!(total, %limit, "response content length exceeded while aggregating");
                self.state = State::Closed;
                Err(AggregateError::response_too_large(total, limit))
            }
        }
    }

    fn on_failure(&mut self, failure: DecodeFailure<T>) -> Result<Option<Aggregated<T>>, AggregateError> {
        let next = if failure.is_fatal() { State::Closed } else { State::Idle };

        match mem::replace(&mut self.state, next) {
            State::Accumulating { head, content, .. } => {
                drop(content);
                let (_, cause, _) = failure.into_parts();
                warn!(cause = %cause, "message failed while aggregating");
                Ok(Some(Aggregated::Message(FullMessage::failed(head, cause))))
            }

            State::Idle => match failure.into_parts() {
                (Some(head), cause, fatal) => {
                    if self.predicate.should_aggregate(&head) {
                        warn!(cause = %cause, "message head failed");
                        Ok(Some(Aggregated::Message(FullMessage::failed(head, cause))))
                    } else {
                        Ok(Some(Aggregated::Forward(Message::Failure(DecodeFailure::new(Some(head), cause, fatal)))))
                    }
                }
                (None, cause, fatal) => {
                    Ok(Some(Aggregated::Forward(Message::Failure(DecodeFailure::new(None, cause, fatal)))))
                }
            },

            State::Bypass | State::Discarding => Ok(Some(Aggregated::Forward(Message::Failure(failure)))),

            State::Closed => {
                self.state = State::Closed;
                Err(AggregateError::ChannelClosed)
            }
        }
    }
}

/// The message is no longer chunked once aggregated: its `Content-Length` becomes the
/// exact sum of its chunks and `Transfer-Encoding` is dropped.
///
/// This holds for bodiless responses too, so a response to `HEAD` leaves with
/// `Content-Length: 0` rather than the length it announced.
fn finish<T: HttpHead>(mut head: T, content: ContentBuffer, trailers: HeaderMap) -> FullMessage<T> {
    let total = content.len();
    set_payload_size(head.headers_mut(), PayloadSize::Length(total));
    let chunks = content.into_chunks();
    trace!(chunks = chunks.len(), total, "aggregated message");
    FullMessage::new(head, chunks, trailers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::MockAggregationPredicate;
    use crate::protocol::{ParseError, RequestHeader, ResponseHeader};
    use bytes::Bytes;
    use http::header::{CONTENT_LENGTH, EXPECT, TRANSFER_ENCODING};
    use http::{HeaderValue, Method, Request, Response, StatusCode, Version};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MIB: usize = 1024 * 1024;

    /// Chunk storage that counts how many chunks were released.
    struct Tracked {
        data: Vec<u8>,
        released: Arc<AtomicUsize>,
    }

    impl AsRef<[u8]> for Tracked {
        fn as_ref(&self) -> &[u8] {
            &self.data
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn tracked(data: &[u8], released: &Arc<AtomicUsize>) -> Bytes {
        Bytes::from_owner(Tracked { data: data.to_vec(), released: Arc::clone(released) })
    }

    fn request(method: Method, version: Version, headers: &[(&str, &str)]) -> Message<RequestHeader> {
        let mut builder = Request::builder().method(method).uri("/upload").version(version);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        Message::Header(builder.body(()).unwrap().into())
    }

    fn chunk(data: &'static [u8]) -> Message<RequestHeader> {
        Message::Payload(PayloadItem::Chunk(Bytes::from_static(data)))
    }

    fn last(data: &'static [u8]) -> Message<RequestHeader> {
        Message::Payload(PayloadItem::Last { data: Bytes::from_static(data), trailers: HeaderMap::new() })
    }

    fn aggregator(max: usize) -> MessageAggregator<RequestHeader> {
        MessageAggregator::new(AggregatorConfig::new(max).unwrap())
    }

    fn expect_full<T: std::fmt::Debug>(out: Option<Aggregated<T>>) -> FullMessage<T> {
        match out {
            Some(Aggregated::Message(full)) => full,
            other => panic!("expected a full message, got {other:?}"),
        }
    }

    fn expect_reply<T: std::fmt::Debug>(out: Option<Aggregated<T>>) -> Reply {
        match out {
            Some(Aggregated::Reply(reply)) => reply,
            other => panic!("expected a reply, got {other:?}"),
        }
    }

    #[test]
    fn two_chunks_and_empty_last() {
        let mut aggregator = aggregator(MIB);

        assert!(aggregator.on_message(request(Method::POST, Version::HTTP_11, &[])).unwrap().is_none());
        assert!(aggregator.on_message(chunk(b"test")).unwrap().is_none());
        assert!(aggregator.on_message(chunk(b"test")).unwrap().is_none());
        let full = expect_full(aggregator.on_message(last(b"")).unwrap());

        assert_eq!(full.content_length(), 8);
        assert_eq!(&full.body()[..], b"testtest");
        assert_eq!(full.head().headers().get(CONTENT_LENGTH).unwrap(), "8");
        assert!(aggregator.is_idle());
    }

    #[test]
    fn chunked_message_loses_transfer_encoding() {
        let mut aggregator = aggregator(MIB);
        let mut trailers = HeaderMap::new();
        trailers.insert("x-trailer", HeaderValue::from_static("done"));

        aggregator.on_message(request(Method::POST, Version::HTTP_11, &[("transfer-encoding", "chunked")])).unwrap();
        aggregator.on_message(chunk(b"abc")).unwrap();
        let full = expect_full(
            aggregator
                .on_message(Message::Payload(PayloadItem::Last { data: Bytes::from_static(b"de"), trailers }))
                .unwrap(),
        );

        assert!(full.head().headers().get(TRANSFER_ENCODING).is_none());
        assert_eq!(full.head().headers().get(CONTENT_LENGTH).unwrap(), "5");
        assert_eq!(full.trailers().get("x-trailer").unwrap(), "done");
        assert_eq!(full.chunks().len(), 2);
    }

    #[test]
    fn exactly_the_limit_is_admitted() {
        let mut aggregator = aggregator(8);

        aggregator.on_message(request(Method::POST, Version::HTTP_11, &[("content-length", "8")])).unwrap();
        aggregator.on_message(chunk(b"1234")).unwrap();
        let full = expect_full(aggregator.on_message(last(b"5678")).unwrap());
        assert_eq!(full.content_length(), 8);
    }

    #[test]
    fn one_byte_over_the_limit_is_413() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut aggregator = aggregator(8);

        aggregator.on_message(request(Method::POST, Version::HTTP_11, &[("transfer-encoding", "chunked")])).unwrap();
        aggregator.on_message(Message::Payload(PayloadItem::Chunk(tracked(b"1234", &released)))).unwrap();
        let reply = expect_reply(
            aggregator.on_message(Message::Payload(PayloadItem::Chunk(tracked(b"56789", &released)))).unwrap(),
        );

        assert_eq!(reply.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(reply.head().headers().get(CONTENT_LENGTH).unwrap(), "0");
        assert!(!reply.is_close());
        assert_eq!(released.load(Ordering::SeqCst), 2);

        // the rest of the rejected message is dropped, the next one is served
        assert!(aggregator.on_message(chunk(b"more")).unwrap().is_none());
        assert!(aggregator.on_message(last(b"")).unwrap().is_none());
        aggregator.on_message(request(Method::POST, Version::HTTP_11, &[])).unwrap();
        let full = expect_full(aggregator.on_message(last(b"ok")).unwrap());
        assert_eq!(&full.body()[..], b"ok");
    }

    #[test]
    fn overflow_on_last_without_keep_alive_closes() {
        let mut aggregator = aggregator(2);

        aggregator.on_message(request(Method::POST, Version::HTTP_10, &[])).unwrap();
        let reply = expect_reply(aggregator.on_message(last(b"abc")).unwrap());
        assert!(reply.is_close());
        assert!(aggregator.is_closed());
        assert!(matches!(aggregator.on_message(chunk(b"x")), Err(AggregateError::ChannelClosed)));
    }

    #[test]
    fn continue_then_aggregate() {
        let mut aggregator = aggregator(MIB);

        let head = request(Method::PUT, Version::HTTP_11, &[("expect", "100-continue"), ("content-length", "4")]);
        let reply = expect_reply(aggregator.on_message(head).unwrap());
        assert_eq!(reply.status(), StatusCode::CONTINUE);

        let full = expect_full(aggregator.on_message(last(b"data")).unwrap());
        assert!(full.head().headers().get(EXPECT).is_none());
        assert_eq!(&full.body()[..], b"data");
    }

    #[test]
    fn continue_over_limit_is_single_413() {
        let mut aggregator = aggregator(4);

        let head = request(Method::PUT, Version::HTTP_11, &[("expect", "100-continue"), ("content-length", "5")]);
        let reply = expect_reply(aggregator.on_message(head).unwrap());
        assert_eq!(reply.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(!reply.is_close());
        assert!(!aggregator.is_closed());

        assert!(aggregator.on_message(last(b"12345")).unwrap().is_none());
        assert!(aggregator.is_idle());
    }

    #[test]
    fn unsupported_expectation_keeps_or_closes() {
        let mut aggregator = aggregator(MIB);
        let reply = expect_reply(
            aggregator.on_message(request(Method::PUT, Version::HTTP_11, &[("expect", "chocolate=yummy")])).unwrap(),
        );
        assert_eq!(reply.status(), StatusCode::EXPECTATION_FAILED);
        assert!(!reply.is_close());
        assert!(aggregator.on_message(last(b"")).unwrap().is_none());
        assert!(aggregator.is_idle());

        let config = AggregatorConfig::new(MIB).unwrap().with_close_on_expectation_failed(true);
        let mut aggregator = MessageAggregator::new(config);
        let reply = expect_reply(
            aggregator.on_message(request(Method::PUT, Version::HTTP_11, &[("expect", "chocolate=yummy")])).unwrap(),
        );
        assert!(reply.is_close());
        assert!(matches!(aggregator.on_message(last(b"")), Err(AggregateError::ChannelClosed)));
    }

    #[test]
    fn selective_aggregation() {
        let predicate = |head: &RequestHeader| head.method() == Method::POST;
        let mut aggregator = MessageAggregator::with_predicate(AggregatorConfig::new(MIB).unwrap(), predicate);

        let forwarded = aggregator.on_message(request(Method::PUT, Version::HTTP_11, &[])).unwrap();
        assert!(matches!(forwarded, Some(Aggregated::Forward(Message::Header(h))) if h.method() == Method::PUT));
        let forwarded = aggregator.on_message(chunk(b"abc")).unwrap();
        assert!(
            matches!(forwarded, Some(Aggregated::Forward(Message::Payload(PayloadItem::Chunk(b)))) if &b[..] == b"abc")
        );
        let forwarded = aggregator.on_message(last(b"")).unwrap();
        assert!(matches!(forwarded, Some(Aggregated::Forward(m)) if m.is_last()));

        aggregator.on_message(request(Method::POST, Version::HTTP_11, &[])).unwrap();
        aggregator.on_message(chunk(b"abc")).unwrap();
        let full = expect_full(aggregator.on_message(last(b"def")).unwrap());
        assert_eq!(&full.body()[..], b"abcdef");
    }

    #[test]
    fn predicate_is_asked_once_per_head() {
        let mut predicate = MockAggregationPredicate::<RequestHeader>::new();
        predicate.expect_should_aggregate().times(2).returning(|_| false);

        let mut aggregator = MessageAggregator::with_predicate(AggregatorConfig::new(MIB).unwrap(), predicate);
        for _ in 0..2 {
            aggregator.on_message(request(Method::GET, Version::HTTP_11, &[])).unwrap();
            aggregator.on_message(chunk(b"x")).unwrap();
            aggregator.on_message(last(b"")).unwrap();
        }
    }

    #[test]
    fn failure_mid_message_releases_and_marks() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut aggregator = aggregator(MIB);

        aggregator.on_message(request(Method::POST, Version::HTTP_11, &[("transfer-encoding", "chunked")])).unwrap();
        aggregator.on_message(Message::Payload(PayloadItem::Chunk(tracked(b"abc", &released)))).unwrap();
        let full = expect_full(
            aggregator
                .on_message(Message::Failure(DecodeFailure::new(None, ParseError::invalid_body("bad chunk"), false)))
                .unwrap(),
        );

        assert!(full.is_failure());
        assert_eq!(full.content_length(), 0);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(aggregator.is_idle());
    }

    #[test]
    fn fatal_failure_on_head_closes() {
        let mut aggregator = aggregator(MIB);
        let head: RequestHeader = Request::post("/").body(()).unwrap().into();

        let full = expect_full(
            aggregator
                .on_message(Message::Failure(DecodeFailure::fatal(
                    Some(head),
                    ParseError::multiple_content_length(["1", "2"]),
                )))
                .unwrap(),
        );
        assert!(matches!(full.failure(), Some(ParseError::MultipleContentLength { .. })));
        assert!(aggregator.is_closed());
    }

    #[test]
    fn failure_without_head_is_forwarded() {
        let mut aggregator = aggregator(MIB);
        let out = aggregator.on_message(Message::Failure(DecodeFailure::fatal(None, ParseError::InvalidMethod))).unwrap();
        assert!(matches!(out, Some(Aggregated::Forward(Message::Failure(_)))));
    }

    #[test]
    fn failure_without_head_bypasses_predicate() {
        let mut predicate = MockAggregationPredicate::<RequestHeader>::new();
        predicate.expect_should_aggregate().never();
        let mut aggregator = MessageAggregator::with_predicate(AggregatorConfig::new(MIB).unwrap(), predicate);

        let out = aggregator.on_message(Message::Failure(DecodeFailure::new(None, ParseError::InvalidUri, false))).unwrap();
        let Some(Aggregated::Forward(Message::Failure(failure))) = out else { panic!("expected forwarded failure") };
        assert!(failure.head().is_none());
        assert!(matches!(failure.cause(), ParseError::InvalidUri));
        assert!(!failure.is_fatal());
    }

    #[test]
    fn bodiless_response_length_is_rewritten() {
        let mut aggregator = MessageAggregator::<ResponseHeader>::new(AggregatorConfig::new(MIB).unwrap());
        let head: ResponseHeader = Response::builder().header(CONTENT_LENGTH, "100").body(()).unwrap().into();

        assert!(aggregator.on_message(Message::Header(head)).unwrap().is_none());
        let full = expect_full(aggregator.on_message(Message::Payload(PayloadItem::eof())).unwrap());

        assert_eq!(full.head().headers().get(CONTENT_LENGTH).unwrap(), "0");
        assert!(full.body().is_empty());
    }

    #[test]
    fn response_overflow_is_fatal() {
        let mut aggregator = MessageAggregator::<ResponseHeader>::new(AggregatorConfig::new(4).unwrap());
        let head: ResponseHeader = Response::builder().body(()).unwrap().into();

        aggregator.on_message(Message::Header(head)).unwrap();
        let err = aggregator.on_message(Message::Payload(PayloadItem::Chunk(Bytes::from_static(b"12345")))).unwrap_err();
        assert!(matches!(err, AggregateError::ResponseTooLarge { attempted: 5, .. }));
        assert!(aggregator.is_closed());
    }

    #[test]
    fn connection_close_releases_buffers() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut aggregator = aggregator(MIB);

        aggregator.on_message(request(Method::POST, Version::HTTP_11, &[("transfer-encoding", "chunked")])).unwrap();
        aggregator.on_message(Message::Payload(PayloadItem::Chunk(tracked(b"a", &released)))).unwrap();
        aggregator.on_message(Message::Payload(PayloadItem::Chunk(tracked(b"b", &released)))).unwrap();
        aggregator.on_connection_closed();

        assert_eq!(released.load(Ordering::SeqCst), 2);
        assert!(matches!(aggregator.on_message(last(b"")), Err(AggregateError::ChannelClosed)));
    }

    #[test]
    fn new_head_mid_message_is_fatal() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut aggregator = aggregator(MIB);

        aggregator.on_message(request(Method::POST, Version::HTTP_11, &[("transfer-encoding", "chunked")])).unwrap();
        aggregator.on_message(Message::Payload(PayloadItem::Chunk(tracked(b"a", &released)))).unwrap();
        let err = aggregator.on_message(request(Method::GET, Version::HTTP_11, &[])).unwrap_err();

        assert!(matches!(err, AggregateError::UnexpectedHead));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn opaque_bytes_pass_through() {
        let mut aggregator = aggregator(MIB);
        let out = aggregator.on_message(Message::Opaque(Bytes::from_static(b"tunnel"))).unwrap();
        assert!(matches!(out, Some(Aggregated::Forward(Message::Opaque(b))) if &b[..] == b"tunnel"));
    }
}
