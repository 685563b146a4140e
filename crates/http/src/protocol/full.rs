//! A completely received HTTP message.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Request, Response};

use crate::protocol::{ParseError, RequestHeader, ResponseHeader};

/// A message head together with its whole body and trailers.
///
/// The body is kept as the ordered list of chunks it arrived in; nothing is copied
/// until [`FullMessage::body`] is asked for a contiguous view of more than one chunk.
/// A message produced from malformed input carries the cause in [`FullMessage::failure`].
#[derive(Debug)]
pub struct FullMessage<T> {
    head: T,
    chunks: Vec<Bytes>,
    content_length: u64,
    trailers: HeaderMap,
    failure: Option<ParseError>,
}

pub type FullRequest = FullMessage<RequestHeader>;
pub type FullResponse = FullMessage<ResponseHeader>;

impl<T> FullMessage<T> {
    pub(crate) fn new(head: T, chunks: Vec<Bytes>, trailers: HeaderMap) -> Self {
        let content_length = chunks.iter().map(|c| c.len() as u64).sum();
        Self { head, chunks, content_length, trailers, failure: None }
    }

    pub(crate) fn failed(head: T, cause: ParseError) -> Self {
        Self { head, chunks: Vec::new(), content_length: 0, trailers: HeaderMap::new(), failure: Some(cause) }
    }

    pub fn head(&self) -> &T {
        &self.head
    }

    pub fn head_mut(&mut self) -> &mut T {
        &mut self.head
    }

    /// The body chunks in arrival order
    pub fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }

    /// Sum of all chunk lengths
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// The body as one contiguous buffer; zero-copy when it arrived as a single chunk.
    pub fn body(&self) -> Bytes {
        match self.chunks.as_slice() {
            [] => Bytes::new(),
            [single] => single.clone(),
            chunks => {
                let mut buf = BytesMut::with_capacity(self.content_length as usize);
                for chunk in chunks {
                    buf.extend_from_slice(chunk);
                }
                buf.freeze()
            }
        }
    }

    pub fn trailers(&self) -> &HeaderMap {
        &self.trailers
    }

    pub fn trailers_mut(&mut self) -> &mut HeaderMap {
        &mut self.trailers
    }

    /// The decode failure this message was produced from, if any
    pub fn failure(&self) -> Option<&ParseError> {
        self.failure.as_ref()
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    pub fn into_parts(self) -> (T, Vec<Bytes>, HeaderMap, Option<ParseError>) {
        (self.head, self.chunks, self.trailers, self.failure)
    }
}

impl FullRequest {
    /// Converts into a `http::Request` with a contiguous body; trailers are dropped.
    pub fn into_request(self) -> Request<Bytes> {
        let body = self.body();
        self.head.body(body)
    }
}

impl FullResponse {
    /// Converts into a `http::Response` with a contiguous body; trailers are dropped.
    pub fn into_response(self) -> Response<Bytes> {
        let body = self.body();
        self.head.body(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};

    fn head() -> RequestHeader {
        Request::builder().method(Method::POST).uri("/").body(()).unwrap().into()
    }

    #[test]
    fn body_concatenates_chunks() {
        let chunks = vec![Bytes::from_static(b"test"), Bytes::from_static(b"test")];
        let full = FullMessage::new(head(), chunks, HeaderMap::new());

        assert_eq!(full.content_length(), 8);
        assert_eq!(full.chunks().len(), 2);
        assert_eq!(&full.body()[..], b"testtest");
        assert!(!full.is_failure());

        let request = full.into_request();
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(&request.body()[..], b"testtest");
    }

    #[test]
    fn single_chunk_body_is_shared() {
        let chunk = Bytes::from_static(b"hello");
        let full = FullMessage::new(head(), vec![chunk.clone()], HeaderMap::new());
        assert_eq!(full.body().as_ptr(), chunk.as_ptr());
    }

    #[test]
    fn failed_message_has_no_body() {
        let head: ResponseHeader = Response::builder().status(StatusCode::OK).body(()).unwrap().into();
        let full = FullMessage::failed(head, ParseError::PrematureEnd);
        assert!(full.is_failure());
        assert_eq!(full.content_length(), 0);
        assert!(full.body().is_empty());
        assert_eq!(full.into_response().status(), StatusCode::OK);
    }
}
