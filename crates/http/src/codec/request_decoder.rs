//! HTTP request decoder module
//!
//! This module provides functionality for decoding HTTP requests using a streaming approach.
//! It handles both head parsing and payload decoding through a state machine pattern.
//!
//! # Example
//!
//! ```no_run
//! use micro_framing::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::new();
//! // ... add request data to buffer ...
//! let result = decoder.decode(&mut buffer);
//! ```

use crate::codec::header::RequestHeadDecoder;
use crate::codec::message_decoder::MessageDecoder;
use crate::codec::{DecoderConfig, GenericRule};
use crate::protocol::{Message, ParseError, RequestHeader};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// A decoder for HTTP requests that handles both headers and payload
///
/// Each request is emitted as `Header`, any number of `Payload(Chunk)` and one
/// `Payload(Last)`. A request with neither `Content-Length` nor
/// `Transfer-Encoding` has an empty body.
#[derive(Debug)]
pub struct RequestDecoder {
    inner: MessageDecoder<RequestHeadDecoder>,
}

impl RequestDecoder {
    /// Creates a new `RequestDecoder` instance
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self { inner: MessageDecoder::new(RequestHeadDecoder::new(config), config) }
    }

    /// Returns true when no request is partially decoded
    pub fn is_idle(&self) -> bool {
        self.inner.is_idle()
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::with_config(DecoderConfig::default())
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<RequestHeader>;
    type Error = ParseError;

    /// Attempts to decode an HTTP request from the provided buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Message::Header(_)))`: Successfully decoded request headers
    /// - `Ok(Some(Message::Payload(_)))`: Successfully decoded a payload chunk
    /// - `Ok(Some(Message::Failure(_)))`: The input is malformed
    /// - `Ok(None)`: Need more data to proceed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.inner.decode_with(src, &mut GenericRule)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.inner.decode_eof_with(src, &mut GenericRule)
    }
}
