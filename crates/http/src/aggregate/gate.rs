//! Admission of a message head before any of its body is buffered.
//!
//! The gate answers `Expect` headers and rejects bodies whose declared length is already
//! over the limit, so a well-behaved client never has to send a body that will be refused.

use http::header::{CONNECTION, EXPECT};
use http::{HeaderValue, StatusCode};
use tracing::{error, info, warn};

use crate::aggregate::AggregatorConfig;
use crate::protocol::{AggregateError, Expectation, HeadKind, HttpHead, ResponseHeader};

/// A response synthesised by the aggregation layer instead of by the application.
#[derive(Debug)]
pub struct Reply {
    head: ResponseHeader,
    close: bool,
}

impl Reply {
    /// `100 Continue`, without headers
    pub fn continue_100() -> Self {
        let mut response = http::Response::new(());
        *response.status_mut() = StatusCode::CONTINUE;
        Self { head: response.into(), close: false }
    }

    /// `413 Payload Too Large` with `Content-Length: 0`
    pub fn too_large(close: bool) -> Self {
        Self::rejection(StatusCode::PAYLOAD_TOO_LARGE, close)
    }

    /// `417 Expectation Failed` with `Content-Length: 0`
    pub fn expectation_failed(close: bool) -> Self {
        Self::rejection(StatusCode::EXPECTATION_FAILED, close)
    }

    fn rejection(status: StatusCode, close: bool) -> Self {
        let mut head = ResponseHeader::empty(status);
        if close {
            head.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
        }
        Self { head, close }
    }

    pub fn status(&self) -> StatusCode {
        self.head.status()
    }

    pub fn head(&self) -> &ResponseHeader {
        &self.head
    }

    /// Whether the connection must be closed once this reply is flushed
    pub fn is_close(&self) -> bool {
        self.close
    }

    pub fn into_head(self) -> ResponseHeader {
        self.head
    }
}

/// What to do with a newly arrived head.
#[derive(Debug)]
pub enum Admission {
    /// Aggregate the message
    Admit,
    /// Send the interim reply, then aggregate; the `Expect` header has been removed
    Continue(Reply),
    /// Send the reply and discard the message
    Reject(Reply),
}

#[derive(Debug, Clone, Copy)]
pub struct ContinuationGate {
    config: AggregatorConfig,
}

impl ContinuationGate {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    /// Decides on `head`, stripping `Expect: 100-continue` from it when the body is welcome.
    ///
    /// A response that announces more than the limit can't be answered on the same
    /// stream and fails with [`AggregateError::ResponseTooLarge`].
    pub fn inspect<T: HttpHead>(&self, head: &mut T) -> Result<Admission, AggregateError> {
        let expectation = head.expectation();

        if expectation == Expectation::Unsupported {
            let close = self.config.close_on_expectation_failed();
            warn!(close, expect = ?head.headers().get(EXPECT), "unsupported expectation, replying 417");
            return Ok(Admission::Reject(Reply::expectation_failed(close)));
        }

        if let Some(length) = head.content_length()
            && self.config.exceeds(length)
        {
            let limit = self.config.max_content_length();
            return match T::KIND {
                HeadKind::Request => {
                    let close = self.close_on_too_large(head.is_keep_alive(), expectation == Expectation::Continue);
                    warn!(length, %limit, close, "declared content length too large, replying 413");
                    Ok(Admission::Reject(Reply::too_large(close)))
                }
                HeadKind::Response => {
                    error!(length, %limit, "declared response content length too large");
                    Err(AggregateError::response_too_large(length, limit))
                }
            };
        }

        if expectation == Expectation::Continue {
            head.headers_mut().remove(EXPECT);
            info!("replying 100 continue");
            return Ok(Admission::Continue(Reply::continue_100()));
        }

        Ok(Admission::Admit)
    }

    /// A rejected request keeps its connection only if it would have kept it anyway.
    pub(crate) fn close_on_too_large(&self, keep_alive: bool, expect_continue: bool) -> bool {
        self.config.close_on_expectation_failed() || !(keep_alive || expect_continue)
    }
}
