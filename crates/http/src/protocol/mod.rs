//! Core HTTP protocol abstractions.
//!
//! This module provides the data model the rest of the crate is built on:
//! framing events, message heads, aggregated messages and the error taxonomy.
//!
//! # Architecture
//!
//! - **Framing events** ([`message`]): what a tokenizer emits for one message
//!   - [`Message`]: a head, a payload item, a decode failure or opaque bytes
//!   - [`PayloadItem`]: a body chunk, or the last chunk with its trailers
//!   - [`PayloadSize`]: how the body of a message is framed on the wire
//!   - [`DecodeFailure`]: a malformed-input marker carried downstream
//!
//! - **Heads** ([`request`], [`response`], [`head`]):
//!   - [`RequestHeader`] / [`ResponseHeader`]: wrap `http` types with an empty body
//!   - [`HttpHead`]: the header interpretations shared by both
//!
//! - **Aggregated messages** ([`full`]):
//!   - [`FullMessage`]: head, ordered body chunks, trailers and an optional failure
//!
//! - **Error Handling** ([`error`]):
//!   - [`HttpError`]: Top-level error type
//!   - [`ParseError`]: tokenizer errors
//!   - [`SendError`]: encoder errors
//!   - [`AggregateError`]: connection-fatal aggregation errors
//!   - [`ExchangeError`]: request/response correlation errors

mod message;
pub use message::DecodeFailure;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod head;
pub(crate) use head::is_chunked;
pub use head::Expectation;
pub use head::HeadKind;
pub use head::HttpHead;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHeader;

mod full;
pub use full::FullMessage;
pub use full::FullRequest;
pub use full::FullResponse;

mod error;
pub use error::AggregateError;
pub use error::ConfigError;
pub use error::ExchangeError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
