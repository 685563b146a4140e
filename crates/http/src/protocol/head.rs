//! Behaviour shared by request and response heads.
//!
//! The aggregation and correlation layers work on any message head; the
//! [`HttpHead`] trait gives them uniform access to the version and header map,
//! plus the handful of header interpretations they depend on (keep-alive,
//! `Expect`, `Content-Length`, chunked transfer coding).

use http::header::{CONNECTION, CONTENT_LENGTH, EXPECT, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue, Version};

/// Which side of an exchange a head belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HeadKind {
    Request,
    Response,
}

/// The value of the `Expect` header, as far as this crate cares.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// No `Expect` header, or not an HTTP/1.1 request
    None,
    /// `Expect: 100-continue`
    Continue,
    /// Any other expectation, which can only be answered with 417
    Unsupported,
}

pub trait HttpHead {
    const KIND: HeadKind;

    fn version(&self) -> Version;

    fn headers(&self) -> &HeaderMap;

    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Whether the connection may be reused after this message.
    ///
    /// `Connection: close` always wins; otherwise HTTP/1.1 defaults to keep-alive
    /// and HTTP/1.0 requires an explicit `Connection: keep-alive`.
    fn is_keep_alive(&self) -> bool {
        let headers = self.headers();
        if contains_token(headers, CONNECTION.as_str(), "close") {
            return false;
        }
        self.version() >= Version::HTTP_11 || contains_token(headers, CONNECTION.as_str(), "keep-alive")
    }

    /// Only HTTP/1.1 (or later) requests can carry a meaningful expectation.
    fn expectation(&self) -> Expectation {
        if Self::KIND != HeadKind::Request || self.version() < Version::HTTP_11 {
            return Expectation::None;
        }

        match self.headers().get(EXPECT) {
            None => Expectation::None,
            Some(value) if value.as_bytes().eq_ignore_ascii_case(b"100-continue") => Expectation::Continue,
            Some(_) => Expectation::Unsupported,
        }
    }

    /// The declared `Content-Length`, if present and a plain number.
    fn content_length(&self) -> Option<u64> {
        let value = self.headers().get(CONTENT_LENGTH)?;
        value.to_str().ok()?.trim().parse::<u64>().ok()
    }

    /// Whether `chunked` is the final transfer coding.
    fn is_chunked(&self) -> bool {
        is_chunked(self.headers().get(TRANSFER_ENCODING))
    }
}

/// Checks if the Transfer-Encoding header indicates chunked encoding.
///
/// According to RFC 7230, chunked must be the last encoding if present.
pub(crate) fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    if let Some(value) = header_value
        && let Some(bytes) = value.as_bytes().rsplit(|b| *b == b',').next()
    {
        return bytes.trim_ascii().eq_ignore_ascii_case(CHUNKED);
    }
    false
}

/// Checks every comma separated token of every `name` field, ignoring case.
fn contains_token(headers: &HeaderMap, name: &str, token: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .flat_map(|value| value.as_bytes().split(|b| *b == b','))
        .any(|t| t.trim_ascii().eq_ignore_ascii_case(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{RequestHeader, ResponseHeader};
    use http::{Method, Request, Response, StatusCode};

    fn request(version: Version, headers: &[(&str, &str)]) -> RequestHeader {
        let mut builder = Request::builder().method(Method::PUT).uri("/upload").version(version);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into()
    }

    #[test]
    fn check_is_chunked() {
        {
            let headers = HeaderMap::new();
            assert!(!is_chunked(headers.get(TRANSFER_ENCODING)))
        }

        {
            let mut headers = HeaderMap::new();
            headers.insert("Transfer-Encoding", "gzip, chunked".parse().unwrap());
            assert!(is_chunked(headers.get(TRANSFER_ENCODING)));
        }

        {
            let mut headers = HeaderMap::new();
            headers.insert("Transfer-Encoding", "Chunked".parse().unwrap());
            assert!(is_chunked(headers.get(TRANSFER_ENCODING)));
        }

        {
            let mut headers = HeaderMap::new();
            headers.insert("Transfer-Encoding", "chunked, gzip".parse().unwrap());
            assert!(!is_chunked(headers.get(TRANSFER_ENCODING)));
        }
    }

    #[test]
    fn keep_alive_defaults_by_version() {
        assert!(request(Version::HTTP_11, &[]).is_keep_alive());
        assert!(!request(Version::HTTP_10, &[]).is_keep_alive());
        assert!(request(Version::HTTP_10, &[("connection", "Keep-Alive")]).is_keep_alive());
        assert!(!request(Version::HTTP_11, &[("connection", "upgrade, close")]).is_keep_alive());
    }

    #[test]
    fn expectation_only_for_http11_requests() {
        assert_eq!(request(Version::HTTP_11, &[]).expectation(), Expectation::None);
        assert_eq!(request(Version::HTTP_11, &[("expect", "100-Continue")]).expectation(), Expectation::Continue);
        assert_eq!(request(Version::HTTP_11, &[("expect", "chocolate=yummy")]).expectation(), Expectation::Unsupported);
        assert_eq!(request(Version::HTTP_10, &[("expect", "chocolate=yummy")]).expectation(), Expectation::None);

        let response: ResponseHeader =
            Response::builder().status(StatusCode::OK).header("expect", "100-continue").body(()).unwrap().into();
        assert_eq!(response.expectation(), Expectation::None);
    }

    #[test]
    fn content_length_parsing() {
        assert_eq!(request(Version::HTTP_11, &[("content-length", " 42 ")]).content_length(), Some(42));
        assert_eq!(request(Version::HTTP_11, &[("content-length", "-1")]).content_length(), None);
        assert_eq!(request(Version::HTTP_11, &[]).content_length(), None);
    }
}
