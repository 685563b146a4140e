//! HTTP response header handling implementation.
//!
//! Mirrors [`RequestHeader`](crate::protocol::RequestHeader): a `http::Response<()>`
//! standing in for the response head until its body has been framed.

use http::response::Parts;
use http::{HeaderMap, HeaderValue, Response, StatusCode, Version};

use crate::protocol::{HeadKind, HttpHead};

/// Represents an HTTP response header.
#[derive(Debug)]
pub struct ResponseHeader {
    inner: Response<()>,
}

impl AsRef<Response<()>> for ResponseHeader {
    fn as_ref(&self) -> &Response<()> {
        &self.inner
    }
}

impl AsMut<Response<()>> for ResponseHeader {
    fn as_mut(&mut self) -> &mut Response<()> {
        &mut self.inner
    }
}

impl ResponseHeader {
    /// Builds a bodyless head with the given status, advertising `Content-Length: 0`.
    pub fn empty(status: StatusCode) -> Self {
        let mut inner = Response::new(());
        *inner.status_mut() = status;
        inner.headers_mut().insert(http::header::CONTENT_LENGTH, HeaderValue::from_static("0"));
        Self { inner }
    }

    /// Consumes the header and returns the inner `Response<()>`.
    pub fn into_inner(self) -> Response<()> {
        self.inner
    }

    /// Attaches a body to this header, converting it into a full `Response<T>`.
    pub fn body<T>(self, body: T) -> Response<T> {
        self.inner.map(|_| body)
    }

    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }
}

impl HttpHead for ResponseHeader {
    const KIND: HeadKind = HeadKind::Response;

    fn version(&self) -> Version {
        self.inner.version()
    }

    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }
}

impl From<Parts> for ResponseHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Response::from_parts(parts, ()) }
    }
}

impl From<Response<()>> for ResponseHeader {
    #[inline]
    fn from(inner: Response<()>) -> Self {
        Self { inner }
    }
}
