//! HTTP codec module for encoding and decoding HTTP/1.x messages
//!
//! This module turns raw bytes into framing events ([`Message`](crate::protocol::Message))
//! and back. It uses a state machine pattern to handle both heads and payload data.
//!
//! # Architecture
//!
//! - Decoding:
//!   - [`RequestDecoder`] / [`ResponseDecoder`]: emit `Header`, `Payload(Chunk)*`,
//!     `Payload(Last)` per message, or a `Failure` on malformed input
//!   - [`EmptyBodyRule`]: decides which responses can't have a body
//!   - [`DecoderConfig`]: head size limits and `Content-Length` leniency
//!
//! - Encoding:
//!   - [`RequestEncoder`] / [`ResponseEncoder`]: write heads and frame bodies
//!   - [`set_payload_size`]: rewrite a head's framing headers
//!
//! # Example
//!
//! ```no_run
//! use micro_framing::codec::{RequestDecoder, ResponseEncoder};
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! // Decode incoming request
//! let mut decoder = RequestDecoder::new();
//! let mut request_buffer = BytesMut::from("GET / HTTP/1.1\r\n\r\n");
//! let request = decoder.decode(&mut request_buffer);
//!
//! // Encode outgoing response
//! let mut encoder = ResponseEncoder::new();
//! // ... encode response ...
//! ```

mod body;
mod config;
mod empty_body;
mod framing;
mod header;
mod message_decoder;
mod message_encoder;
mod request_decoder;
mod response_decoder;

pub use config::{DecoderConfig, MAX_HEADERS_LIMIT};
pub use empty_body::is_status_always_empty;
pub use empty_body::EmptyBodyRule;
pub use empty_body::GenericRule;
pub use framing::set_payload_size;
pub use header::HeaderEncoder;
pub use message_encoder::MessageEncoder;
pub use message_encoder::RequestEncoder;
pub use message_encoder::ResponseEncoder;
pub use request_decoder::RequestDecoder;
pub use response_decoder::ResponseDecoder;
