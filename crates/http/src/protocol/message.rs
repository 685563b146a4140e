use bytes::{Buf, Bytes};
use http::HeaderMap;

use crate::protocol::ParseError;

/// A single framing event of an HTTP message stream.
///
/// Decoders emit, per message, an ordered sequence `Header → Payload(Chunk)* → Payload(Last)`,
/// or a [`Message::Failure`] in place of any of these. Encoders consume the same shape.
///
/// The generic parameter `T` represents the head type (request or response header),
/// while `Data` represents the type of the payload data (defaults to `Bytes`).
#[derive(Debug)]
pub enum Message<T, Data: Buf = Bytes> {
    /// Contains the head (start line and headers) of a message
    Header(T),
    /// Contains a chunk of payload data or the terminal item of a message
    Payload(PayloadItem<Data>),
    /// The tokenizer could not make sense of the input
    Failure(DecodeFailure<T>),
    /// Bytes forwarded verbatim once the connection left HTTP (CONNECT tunnel or upgrade)
    Opaque(Data),
}

/// Represents an item in the HTTP message payload stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// The terminal item: a final (possibly empty) chunk plus the trailing headers
    Last { data: Data, trailers: HeaderMap },
}

/// Represents the size information of an HTTP payload.
///
/// This enum is used to determine how the payload should be processed:
/// - Known length: Process exact number of bytes
/// - Chunked: Process using chunked transfer encoding
/// - Empty: No payload to process
/// - UntilClose: the body runs until the peer closes the connection (responses only)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Payload using chunked transfer encoding
    Chunked,
    /// Empty payload (no body)
    Empty,
    /// Payload delimited by connection close
    UntilClose,
}

/// A tokenizer failure, carried through the pipeline instead of being thrown.
///
/// `head` is present when the start line and headers were readable but the framing
/// was not (e.g. conflicting `Content-Length` values). A fatal failure means the
/// byte stream can no longer be split into messages.
#[derive(Debug)]
pub struct DecodeFailure<T> {
    head: Option<T>,
    cause: ParseError,
    fatal: bool,
}

impl<T> DecodeFailure<T> {
    pub fn new(head: Option<T>, cause: ParseError, fatal: bool) -> Self {
        Self { head, cause, fatal }
    }

    /// A failure after which the decoder cannot find the next message boundary.
    pub fn fatal(head: Option<T>, cause: ParseError) -> Self {
        Self::new(head, cause, true)
    }

    pub fn head(&self) -> Option<&T> {
        self.head.as_ref()
    }

    pub fn cause(&self) -> &ParseError {
        &self.cause
    }

    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    pub fn into_parts(self) -> (Option<T>, ParseError, bool) {
        (self.head, self.cause, self.fatal)
    }
}

impl PayloadSize {
    /// Returns true if the payload uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// Returns true if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }

    /// The length announced up front, if the framing carries one
    #[inline]
    pub fn declared_length(&self) -> Option<u64> {
        match self {
            PayloadSize::Length(n) => Some(*n),
            PayloadSize::Empty => Some(0),
            PayloadSize::Chunked | PayloadSize::UntilClose => None,
        }
    }
}

impl<T, D: Buf> Message<T, D> {
    /// Returns true if this message contains payload data
    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    /// Returns true if this message contains header information
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self, Message::Failure(_))
    }

    /// Returns true if this is the last framing event of a message
    #[inline]
    pub fn is_last(&self) -> bool {
        matches!(self, Message::Payload(PayloadItem::Last { .. }) | Message::Failure(_))
    }

    /// Converts the message into a PayloadItem if it contains payload data
    pub fn into_payload_item(self) -> Option<PayloadItem<D>> {
        match self {
            Message::Payload(payload_item) => Some(payload_item),
            _ => None,
        }
    }
}

/// Converts bytes into a Message
///
/// This allows bytes to be directly converted into a Message for sending payload data.
impl<T> From<Bytes> for Message<T> {
    fn from(bytes: Bytes) -> Self {
        Self::Payload(PayloadItem::Chunk(bytes))
    }
}

impl<D: Buf> PayloadItem<D> {
    /// Returns true if this item terminates the payload stream
    #[inline]
    pub fn is_last(&self) -> bool {
        matches!(self, PayloadItem::Last { .. })
    }

    /// Returns true if this item contains chunk data
    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    /// Number of payload bytes carried by this item
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            PayloadItem::Chunk(data) | PayloadItem::Last { data, .. } => data.remaining(),
        }
    }
}

impl PayloadItem {
    /// A terminal item with no data and no trailers
    pub fn eof() -> Self {
        PayloadItem::Last { data: Bytes::new(), trailers: HeaderMap::new() }
    }

    /// A terminal item with no data, carrying the given trailers
    pub fn eof_with_trailers(trailers: HeaderMap) -> Self {
        PayloadItem::Last { data: Bytes::new(), trailers }
    }

    /// Returns a reference to the contained bytes
    pub fn as_bytes(&self) -> &Bytes {
        match self {
            PayloadItem::Chunk(bytes) | PayloadItem::Last { data: bytes, .. } => bytes,
        }
    }

    /// Returns the trailers if this is the terminal item
    pub fn trailers(&self) -> Option<&HeaderMap> {
        match self {
            PayloadItem::Chunk(_) => None,
            PayloadItem::Last { trailers, .. } => Some(trailers),
        }
    }

    /// Consumes the PayloadItem and returns the contained bytes
    pub fn into_bytes(self) -> Bytes {
        match self {
            PayloadItem::Chunk(bytes) | PayloadItem::Last { data: bytes, .. } => bytes,
        }
    }
}
