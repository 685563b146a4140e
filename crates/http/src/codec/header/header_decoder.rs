//! HTTP head decoder implementation for parsing request and response heads
//!
//! This module provides functionality for decoding the start line and header fields of
//! HTTP/1.x messages from raw bytes into structured [`RequestHeader`] and [`ResponseHeader`]
//! values.
//!
//! # Features
//!
//! - Header parsing using `httparse`, without copying header data
//! - Support for HTTP/1.0 and HTTP/1.1
//! - Configurable protection against oversized heads via [`DecoderConfig`]
//!
//! # Implementation Details
//!
//! The decoder works in multiple stages:
//!
//! 1. Parse raw bytes using `httparse`
//! 2. Record header name/value byte ranges
//! 3. Split the head off the source buffer
//! 4. Convert to typed `http` structures sharing that buffer
//!
//! The index-based approach lets header values be slices of one frozen buffer
//! instead of individually allocated strings.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::{DecoderConfig, MAX_HEADERS_LIMIT};
use crate::ensure;
use crate::protocol::{ParseError, RequestHeader, ResponseHeader};

/// Decoder for HTTP request heads implementing the [`Decoder`] trait.
#[derive(Debug, Clone, Default)]
pub struct RequestHeadDecoder {
    config: DecoderConfig,
}

/// Decoder for HTTP response heads implementing the [`Decoder`] trait.
#[derive(Debug, Clone, Default)]
pub struct ResponseHeadDecoder {
    config: DecoderConfig,
}

impl RequestHeadDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }
}

impl ResponseHeadDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }
}

impl Decoder for RequestHeadDecoder {
    type Item = RequestHeader;
    type Error = ParseError;

    /// Attempts to decode a request head from the provided bytes buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(header))` if a complete head was successfully parsed
    /// - `Ok(None)` if more data is needed
    /// - `Err(ParseError)` if parsing failed
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if:
    /// - The number of headers exceeds the configured maximum
    /// - The total head size exceeds the configured maximum
    /// - The HTTP version is not supported
    /// - Headers contain invalid characters
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let max_headers = self.config.max_headers().min(MAX_HEADERS_LIMIT);
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS_LIMIT];
        let mut req = httparse::Request::new(&mut headers[..max_headers]);

        let parsed_result = req.parse(src).map_err(|e| map_httparse_error(e, max_headers));

        let body_offset = match parsed_result? {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(
                    src.len() <= self.config.max_header_bytes(),
                    ParseError::too_large_header(src.len(), self.config.max_header_bytes())
                );
                return Ok(None);
            }
        };

        trace!(head_size = body_offset, "parsed request head");
        ensure!(
            body_offset <= self.config.max_header_bytes(),
            ParseError::too_large_header(body_offset, self.config.max_header_bytes())
        );

        let version = parse_version(req.version)?;
        let method = req.method.ok_or(ParseError::InvalidMethod)?;
        let path = req.path.ok_or(ParseError::InvalidUri)?;

        let mut builder = Request::builder()
            .method(http::Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidMethod)?)
            .uri(http::Uri::try_from(path).map_err(|_| ParseError::InvalidUri)?)
            .version(version);

        let index = HeaderIndex::record(src, req.headers);
        let header_bytes = src.split_to(body_offset).freeze();

        if let Some(map) = builder.headers_mut() {
            fill_headers(&header_bytes, &index, map)?;
        }

        let request = builder.body(()).map_err(ParseError::invalid_header)?;
        Ok(Some(RequestHeader::from(request)))
    }
}

impl Decoder for ResponseHeadDecoder {
    type Item = ResponseHeader;
    type Error = ParseError;

    /// Attempts to decode a response head from the provided bytes buffer.
    ///
    /// Same contract as [`RequestHeadDecoder`]; the status code must be a valid three digit code.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let max_headers = self.config.max_headers().min(MAX_HEADERS_LIMIT);
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS_LIMIT];
        let mut resp = httparse::Response::new(&mut headers[..max_headers]);

        let parsed_result = resp.parse(src).map_err(|e| map_httparse_error(e, max_headers));

        let body_offset = match parsed_result? {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(
                    src.len() <= self.config.max_header_bytes(),
                    ParseError::too_large_header(src.len(), self.config.max_header_bytes())
                );
                return Ok(None);
            }
        };

        trace!(head_size = body_offset, "parsed response head");
        ensure!(
            body_offset <= self.config.max_header_bytes(),
            ParseError::too_large_header(body_offset, self.config.max_header_bytes())
        );

        let version = parse_version(resp.version)?;
        let code = resp.code.ok_or(ParseError::InvalidStatus(None))?;
        let status = StatusCode::from_u16(code).map_err(|_| ParseError::InvalidStatus(Some(code)))?;

        let index = HeaderIndex::record(src, resp.headers);
        let header_bytes = src.split_to(body_offset).freeze();

        let mut response = Response::new(());
        *response.status_mut() = status;
        *response.version_mut() = version;
        fill_headers(&header_bytes, &index, response.headers_mut())?;

        Ok(Some(ResponseHeader::from(response)))
    }
}

fn map_httparse_error(e: Error, max_headers: usize) -> ParseError {
    match e {
        Error::TooManyHeaders => ParseError::too_many_headers(max_headers),
        Error::Version => ParseError::InvalidVersion(None),
        Error::Status => ParseError::InvalidStatus(None),
        e => ParseError::invalid_header(e.to_string()),
    }
}

fn parse_version(version: Option<u8>) -> Result<Version, ParseError> {
    match version {
        Some(0) => Ok(Version::HTTP_10),
        Some(1) => Ok(Version::HTTP_11),
        // Currently HTTP/2 and HTTP/3 not supported
        _ => Err(ParseError::InvalidVersion(version)),
    }
}

fn fill_headers(header_bytes: &Bytes, index: &[HeaderIndex], headers: &mut HeaderMap) -> Result<(), ParseError> {
    headers.reserve(index.len());
    for index in index {
        let name = HeaderName::from_bytes(&header_bytes[index.name.0..index.name.1]).map_err(ParseError::invalid_header)?;
        let value = HeaderValue::from_maybe_shared(header_bytes.slice(index.value.0..index.value.1))
            .map_err(ParseError::invalid_header)?;
        headers.append(name, value);
    }
    Ok(())
}

/// Stores the byte range positions of a header's name and value within the original buffer.
///
/// This struct is used internally by the decoder to perform zero-copy parsing of headers
/// by recording the positions of header names and values rather than copying the data.
#[derive(Clone, Copy)]
struct HeaderIndex {
    /// Start and end byte positions of the header name
    name: (usize, usize),
    /// Start and end byte positions of the header value
    value: (usize, usize),
}

impl HeaderIndex {
    /// Records the byte positions of header names and values from the parsed headers.
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>]) -> Vec<HeaderIndex> {
        let bytes_ptr = bytes.as_ptr() as usize;
        headers
            .iter()
            .map(|header| {
                let name_start = header.name.as_ptr() as usize - bytes_ptr;
                let value_start = header.value.as_ptr() as usize - bytes_ptr;
                HeaderIndex {
                    name: (name_start, name_start + header.name.len()),
                    value: (value_start, value_start + header.value.len()),
                }
            })
            .collect()
    }
}
