//! Decoder for `Transfer-Encoding: chunked` bodies,
//! [RFC 7230 Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1).
//!
//! Chunk data is handed out as soon as it arrives, without waiting for the whole chunk.
//! The trailer section after the zero-sized chunk is parsed into a [`HeaderMap`] and
//! attached to the last payload item.

use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue};
use tokio_util::codec::Decoder;
use tracing::trace;

/// Maximum number of trailer fields after the last chunk
const MAX_TRAILER_NUM: usize = 32;

/// Maximum size in bytes of the trailer section
const MAX_TRAILER_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Hex digits of the chunk size
    Size { size: u64, digits: usize },
    /// Whitespace between the size and the extensions or line end
    SizeWhitespace { size: u64 },
    /// Chunk extensions, ignored
    Extension { size: u64 },
    SizeLf { size: u64 },
    Data { remaining: u64 },
    DataCr,
    DataLf,
    Trailers,
    Done,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: State::Size { size: 0, digits: 0 } }
    }

    /// Returns true once the terminal chunk and trailers have been read.
    pub fn is_finished(&self) -> bool {
        self.state == State::Done
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                State::Done => return Ok(Some(PayloadItem::eof())),

                State::Trailers => {
                    let Some(trailers) = read_trailers(src)? else {
                        return Ok(None);
                    };
                    trace!(trailers = trailers.len(), "finished reading chunked data");
                    self.state = State::Done;
                    return Ok(Some(PayloadItem::eof_with_trailers(trailers)));
                }

                State::Data { remaining } => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let len = usize::try_from(remaining).map_or(src.len(), |r| r.min(src.len()));
                    let data = src.split_to(len).freeze();
                    let remaining = remaining - len as u64;
                    self.state = if remaining == 0 { State::DataCr } else { State::Data { remaining } };
                    trace!(len, remaining, "read chunk data");
                    return Ok(Some(PayloadItem::Chunk(data)));
                }

                state => {
                    let Some(&byte) = src.first() else {
                        return Ok(None);
                    };
                    src.advance(1);
                    self.state = state.next(byte)?;
                }
            }
        }
    }
}

impl State {
    /// Advances the size line and data delimiter states by one byte.
    fn next(self, byte: u8) -> Result<State, ParseError> {
        match (self, byte) {
            (State::Size { size, digits }, b) if b.is_ascii_hexdigit() => {
                let digit = u64::from(char::from(b).to_digit(16).unwrap_or_default());
                let size = size
                    .checked_mul(16)
                    .and_then(|s| s.checked_add(digit))
                    .ok_or_else(|| ParseError::invalid_body("chunk size overflows u64"))?;
                Ok(State::Size { size, digits: digits + 1 })
            }
            (State::Size { digits: 0, .. }, _) => Err(ParseError::invalid_body("chunk size line without a size")),
            (State::Size { size, .. } | State::SizeWhitespace { size }, b'\t' | b' ') => {
                Ok(State::SizeWhitespace { size })
            }
            (State::Size { size, .. } | State::SizeWhitespace { size }, b';') => Ok(State::Extension { size }),
            (State::Size { size, .. } | State::SizeWhitespace { size } | State::Extension { size }, b'\r') => {
                Ok(State::SizeLf { size })
            }
            (State::Size { .. } | State::SizeWhitespace { .. }, _) => {
                Err(ParseError::invalid_body("invalid byte in chunk size line"))
            }

            // a bare LF inside extensions would be read as a line end by lenient peers
            (State::Extension { .. }, b'\n') => Err(ParseError::invalid_body("chunk extension contains a newline")),
            (State::Extension { size }, _) => Ok(State::Extension { size }),

            (State::SizeLf { size: 0 }, b'\n') => Ok(State::Trailers),
            (State::SizeLf { size }, b'\n') => Ok(State::Data { remaining: size }),
            (State::SizeLf { .. }, _) => Err(ParseError::invalid_body("chunk size line must end with CRLF")),

            (State::DataCr, b'\r') => Ok(State::DataLf),
            (State::DataLf, b'\n') => Ok(State::Size { size: 0, digits: 0 }),
            (State::DataCr | State::DataLf, _) => Err(ParseError::invalid_body("chunk data must end with CRLF")),

            (state @ (State::Data { .. } | State::Trailers | State::Done), _) => Ok(state),
        }
    }
}

/// Parses the trailer section that follows the zero-sized chunk.
///
/// Returns `Ok(None)` while the section is incomplete.
fn read_trailers(src: &mut BytesMut) -> Result<Option<HeaderMap>, ParseError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_TRAILER_NUM];

    let (consumed, trailers) = match httparse::parse_headers(src, &mut headers) {
        Ok(httparse::Status::Complete((consumed, parsed))) => {
            let mut trailers = HeaderMap::with_capacity(parsed.len());
            for header in parsed {
                let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
                let value = HeaderValue::from_bytes(header.value).map_err(ParseError::invalid_header)?;
                trailers.append(name, value);
            }
            (consumed, trailers)
        }
        Ok(httparse::Status::Partial) => {
            if src.len() > MAX_TRAILER_BYTES {
                return Err(ParseError::too_large_header(src.len(), MAX_TRAILER_BYTES));
            }
            return Ok(None);
        }
        Err(httparse::Error::TooManyHeaders) => return Err(ParseError::too_many_headers(MAX_TRAILER_NUM)),
        Err(e) => return Err(ParseError::invalid_header(e)),
    };

    src.advance(consumed);
    Ok(Some(trailers))
}
