//! Client side request/response correlation.
//!
//! A response can only be framed once the request it answers is known: the reply to a
//! `HEAD` never has a body, and a successful `CONNECT` turns the connection into a tunnel.
//! [`ClientExchange`] keeps the methods of sent requests in order and answers the
//! response decoder's [`EmptyBodyRule`] queries from them.

use std::collections::VecDeque;

use bytes::{Buf, BytesMut};
use http::{Method, StatusCode};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, trace};

use crate::codec::{is_status_always_empty, DecoderConfig, EmptyBodyRule, RequestEncoder, ResponseDecoder};
use crate::protocol::{ExchangeError, HttpError, Message, RequestHeader, ResponseHeader, SendError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientConfig {
    fail_on_missing_response: bool,
    parse_after_connect: bool,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count requests still waiting for a response and report them when the connection closes.
    pub fn with_fail_on_missing_response(mut self, enabled: bool) -> Self {
        self.fail_on_missing_response = enabled;
        self
    }

    /// Keep parsing HTTP after a successful `CONNECT` instead of forwarding opaque bytes.
    pub fn with_parse_after_connect(mut self, enabled: bool) -> Self {
        self.parse_after_connect = enabled;
        self
    }

    pub fn fail_on_missing_response(&self) -> bool {
        self.fail_on_missing_response
    }

    pub fn parse_after_connect(&self) -> bool {
        self.parse_after_connect
    }
}

/// Shared state between the request encoder and the response decoder of one connection.
#[derive(Debug)]
pub struct ClientExchange {
    config: ClientConfig,
    methods: VecDeque<Method>,
    done: bool,
    /// Requests fully sent minus final responses received; negative while a
    /// response arrived before its request finished sending
    outstanding: i64,
}

impl ClientExchange {
    pub fn new(config: ClientConfig) -> Self {
        Self { config, methods: VecDeque::new(), done: false, outstanding: 0 }
    }

    /// A request head is about to be written.
    pub fn on_encode_request_head(&mut self, method: &Method) {
        if self.done {
            return;
        }
        trace!(%method, queued = self.methods.len() + 1, "request sent, awaiting response");
        self.methods.push_back(method.clone());
    }

    /// The last item of a request body was written, a response is now due.
    pub fn on_encode_last_request_content(&mut self) {
        if self.config.fail_on_missing_response && !self.done {
            self.outstanding += 1;
        }
    }

    /// A response head was decoded; returns true when its body is absent whatever the
    /// headers announce.
    ///
    /// Interim (1xx) responses other than `101` leave the pending method in place, since
    /// the final response to the same request is still to come.
    pub fn on_decode_response_head(&mut self, status: StatusCode) -> bool {
        let interim = status.is_informational() && status != StatusCode::SWITCHING_PROTOCOLS;

        let method = if interim { self.methods.front().cloned() } else { self.methods.pop_front() };
        trace!(%status, method = ?method, interim, "response head decoded");

        if !interim && self.config.fail_on_missing_response {
            self.outstanding -= 1;
        }

        if status.is_informational() {
            return is_status_always_empty(status);
        }

        match method {
            Some(Method::HEAD) => true,
            Some(Method::CONNECT) if status.is_success() => {
                if !self.config.parse_after_connect {
                    debug!(%status, "tunnel established, forwarding the connection as opaque bytes");
                    self.done = true;
                    self.methods.clear();
                }
                true
            }
            _ => is_status_always_empty(status),
        }
    }

    /// Reports requests that will never be answered. The count is reset once reported.
    pub fn on_connection_closed(&mut self) -> Result<(), ExchangeError> {
        let outstanding = std::mem::take(&mut self.outstanding);
        if self.config.fail_on_missing_response && outstanding > 0 {
            let missing = outstanding.unsigned_abs();
            error!(missing, "connection closed with requests left unanswered");
            return Err(ExchangeError::PrematureClosure { missing });
        }
        Ok(())
    }

    /// True once a tunnel was established; nothing is parsed as HTTP anymore.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn outstanding(&self) -> i64 {
        self.outstanding
    }

    pub fn pending_methods(&self) -> usize {
        self.methods.len()
    }
}

impl Default for ClientExchange {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl EmptyBodyRule<ResponseHeader> for ClientExchange {
    fn is_content_always_empty(&mut self, head: &ResponseHeader) -> bool {
        self.on_decode_response_head(head.status())
    }
}

/// Encodes requests and decodes the responses answering them over one connection.
#[derive(Debug)]
pub struct ClientCodec {
    encoder: RequestEncoder,
    decoder: ResponseDecoder,
    exchange: ClientExchange,
    encoder_upgraded: bool,
    upgraded: bool,
}

impl ClientCodec {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_decoder_config(config, DecoderConfig::default())
    }

    pub fn with_decoder_config(config: ClientConfig, decoder_config: DecoderConfig) -> Self {
        Self {
            encoder: RequestEncoder::new(),
            decoder: ResponseDecoder::with_config(decoder_config),
            exchange: ClientExchange::new(config),
            encoder_upgraded: false,
            upgraded: false,
        }
    }

    pub fn exchange(&self) -> &ClientExchange {
        &self.exchange
    }

    /// After the upgrade request was sent, only opaque bytes are written.
    pub fn prepare_upgrade(&mut self) {
        self.encoder_upgraded = true;
    }

    /// The upgrade completed; both directions carry opaque bytes from now on.
    pub fn upgrade(&mut self) {
        self.encoder_upgraded = true;
        self.upgraded = true;
    }

    fn is_pass_through(&self) -> bool {
        self.upgraded || (self.exchange.is_done() && self.decoder.is_idle())
    }
}

impl Default for ClientCodec {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

fn take_opaque<T>(src: &mut BytesMut) -> Option<Message<T>> {
    if src.is_empty() {
        return None;
    }
    Some(Message::Opaque(src.split().freeze()))
}

impl Decoder for ClientCodec {
    type Item = Message<ResponseHeader>;
    type Error = HttpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.is_pass_through() {
            return Ok(take_opaque(src));
        }
        Ok(self.decoder.decode_with(src, &mut self.exchange)?)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let message = if self.is_pass_through() {
            take_opaque(src)
        } else {
            self.decoder.decode_eof_with(src, &mut self.exchange)?
        };

        if message.is_none() {
            self.exchange.on_connection_closed()?;
        }
        Ok(message)
    }
}

impl<D: Buf> Encoder<Message<RequestHeader, D>> for ClientCodec {
    type Error = HttpError;

    fn encode(&mut self, item: Message<RequestHeader, D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.encoder_upgraded || self.exchange.is_done() {
            return match item {
                Message::Opaque(_) => Ok(self.encoder.encode(item, dst)?),
                _ => {
                    error!("http message written after the connection left http");
                    Err(SendError::unexpected_item("http message on an upgraded connection").into())
                }
            };
        }

        let is_last = matches!(&item, Message::Payload(payload) if payload.is_last());
        if let Message::Header(head) = &item {
            self.exchange.on_encode_request_head(head.method());
        }

        self.encoder.encode(item, dst)?;

        if is_last && self.encoder.is_idle() {
            self.exchange.on_encode_last_request_content();
        }
        Ok(())
    }
}
