//! HTTP head processing module for encoding and decoding message heads
//!
//! # Components
//!
//! - [`RequestHeadDecoder`] / [`ResponseHeadDecoder`]: decode a start line and header fields
//!   - Supports standard HTTP/1.0 and HTTP/1.1 head format
//!   - Enforces the size limits of [`DecoderConfig`](crate::codec::DecoderConfig)
//!
//! - [`HeaderEncoder`]: writes a head back to bytes, header fields as-is

mod header_decoder;
mod header_encoder;

pub use header_decoder::RequestHeadDecoder;
pub use header_decoder::ResponseHeadDecoder;
pub use header_encoder::HeaderEncoder;
pub(crate) use header_encoder::FastWrite;
