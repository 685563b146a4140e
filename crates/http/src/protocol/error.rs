use std::io;
use std::num::NonZeroUsize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },

    #[error("aggregate error: {source}")]
    AggregateError {
        #[from]
        source: AggregateError,
    },

    #[error("exchange error: {source}")]
    ExchangeError {
        #[from]
        source: ExchangeError,
    },
}

/// `tokio_util` requires decoder errors to be constructible from io errors.
impl From<io::Error> for HttpError {
    fn from(e: io::Error) -> Self {
        ParseError::io(e).into()
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid http status: {0:?}")]
    InvalidStatus(Option<u16>),

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("Multiple Content-Length values found: {values:?}")]
    MultipleContentLength { values: Vec<String> },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("connection closed before the message was complete")]
    PrematureEnd,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn multiple_content_length<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self::MultipleContentLength { values: values.into_iter().map(|s| s.to_string()).collect() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("unexpected item: {reason}")]
    UnexpectedItem { reason: &'static str },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn unexpected_item(reason: &'static str) -> Self {
        Self::UnexpectedItem { reason }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Connection-fatal conditions raised while aggregating a message.
///
/// Recoverable conditions (oversized requests, malformed input) never show up here;
/// they are answered with a synthetic response or carried on the emitted message.
#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("response entity too large: {attempted} bytes exceed the limit {limit}")]
    ResponseTooLarge { attempted: u64, limit: NonZeroUsize },

    #[error("writing on a closed channel")]
    ChannelClosed,

    #[error("received a new message head while the previous message is still in flight")]
    UnexpectedHead,
}

impl AggregateError {
    pub fn response_too_large(attempted: u64, limit: NonZeroUsize) -> Self {
        Self::ResponseTooLarge { attempted, limit }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("channel gone inactive with {missing} missing response(s)")]
    PrematureClosure { missing: u64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_content_length must be a positive integer, got {0}")]
    InvalidMaxContentLength(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premature_closure_reports_missing_count() {
        let e = ExchangeError::PrematureClosure { missing: 2 };
        assert_eq!(e.to_string(), "channel gone inactive with 2 missing response(s)");
    }

    #[test]
    fn multiple_content_length_message() {
        let e = ParseError::multiple_content_length(["1", "2"]);
        assert!(e.to_string().contains("Multiple Content-Length values found"));
    }

    #[test]
    fn closed_channel_message() {
        let e: HttpError = AggregateError::ChannelClosed.into();
        assert_eq!(e.to_string(), "aggregate error: writing on a closed channel");
    }
}
