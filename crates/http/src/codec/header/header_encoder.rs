//! HTTP head encoder implementation for serializing request and response heads
//!
//! This module writes the start line and header fields of an HTTP/1.x message into raw
//! bytes. Header fields are written exactly as they are found on the head; the message
//! encoders decide the framing headers beforehand.

use crate::protocol::{RequestHeader, ResponseHeader, SendError};

use bytes::{BufMut, BytesMut};

use http::{HeaderMap, Version};
use std::io;
use std::io::{ErrorKind, Write};
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for HTTP heads implementing the [`Encoder`] trait for both
/// [`RequestHeader`] and [`ResponseHeader`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderEncoder;

impl Encoder<RequestHeader> for HeaderEncoder {
    type Error = SendError;

    /// Writes `METHOD request-target HTTP/1.x` followed by the header fields.
    fn encode(&mut self, header: RequestHeader, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(INIT_HEADER_SIZE);
        let version = version_str(header.version())?;

        let target = header.uri().path_and_query().map(|p| p.as_str()).unwrap_or("/");
        // CONNECT uses the authority form, absolute URIs are kept as sent
        let target = match (header.uri().scheme(), header.uri().authority()) {
            (Some(_), Some(_)) => header.uri().to_string(),
            (None, Some(authority)) => authority.to_string(),
            _ => target.to_owned(),
        };

        write!(FastWrite(dst), "{} {} {}\r\n", header.method(), target, version)?;
        write_headers(header.headers(), dst);
        Ok(())
    }
}

impl Encoder<ResponseHeader> for HeaderEncoder {
    type Error = SendError;

    /// Writes `HTTP/1.x code reason` followed by the header fields.
    fn encode(&mut self, header: ResponseHeader, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(INIT_HEADER_SIZE);
        let version = version_str(header.version())?;

        write!(
            FastWrite(dst),
            "{} {} {}\r\n",
            version,
            header.status().as_str(),
            header.status().canonical_reason().unwrap_or("")
        )?;
        write_headers(header.headers(), dst);
        Ok(())
    }
}

fn version_str(version: Version) -> Result<&'static str, SendError> {
    match version {
        Version::HTTP_11 => Ok("HTTP/1.1"),
        Version::HTTP_10 => Ok("HTTP/1.0"),
        v => {
            error!(http_version = ?v, "unsupported http version");
            Err(io::Error::from(ErrorKind::Unsupported).into())
        }
    }
}

fn write_headers(headers: &HeaderMap, dst: &mut BytesMut) {
    for (header_name, header_value) in headers.iter() {
        dst.put_slice(header_name.as_ref());
        dst.put_slice(b": ");
        dst.put_slice(header_value.as_ref());
        dst.put_slice(b"\r\n");
    }
    dst.put_slice(b"\r\n");
}

/// Fast writer implementation for writing to BytesMut.
///
/// This is an optimization to avoid unnecessary bounds checking when writing
/// to the bytes buffer, since we've already reserved enough space.
pub(crate) struct FastWrite<'a>(pub(crate) &'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Request, Response, StatusCode};

    #[test]
    fn encode_response_head() {
        let head: ResponseHeader = Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header(http::header::CONTENT_LENGTH, "0")
            .body(())
            .unwrap()
            .into();

        let mut dst = BytesMut::new();
        HeaderEncoder.encode(head, &mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n");
    }

    #[test]
    fn encode_request_head() {
        let head: RequestHeader = Request::builder()
            .method(Method::POST)
            .uri("/submit?x=1")
            .header(http::header::HOST, "example.com")
            .body(())
            .unwrap()
            .into();

        let mut dst = BytesMut::new();
        HeaderEncoder.encode(head, &mut dst).unwrap();

        assert_eq!(&dst[..], b"POST /submit?x=1 HTTP/1.1\r\nhost: example.com\r\n\r\n");
    }

    #[test]
    fn encode_connect_authority() {
        let head: RequestHeader =
            Request::builder().method(Method::CONNECT).uri("example.com:443").body(()).unwrap().into();

        let mut dst = BytesMut::new();
        HeaderEncoder.encode(head, &mut dst).unwrap();
        assert!(dst.starts_with(b"CONNECT example.com:443 HTTP/1.1\r\n"));
    }

    #[test]
    fn unsupported_version() {
        let head: ResponseHeader = Response::builder().version(Version::HTTP_2).body(()).unwrap().into();
        assert!(HeaderEncoder.encode(head, &mut BytesMut::new()).is_err());
    }
}
