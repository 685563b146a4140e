//! Whether a message can carry a body at all, independent of its framing headers.

use http::StatusCode;

use crate::protocol::{RequestHeader, ResponseHeader};

/// Decides, per head, that a message has no body whatever its headers announce.
///
/// The decoders consult the rule right after a head is parsed. Stateful
/// implementations (the client exchange, which needs the method of the request
/// being answered) take `&mut self`.
pub trait EmptyBodyRule<H> {
    fn is_content_always_empty(&mut self, head: &H) -> bool;
}

/// The status-only rule: 1xx, 204 and 304 responses never carry a body.
///
/// Requests always follow their framing headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericRule;

impl EmptyBodyRule<ResponseHeader> for GenericRule {
    fn is_content_always_empty(&mut self, head: &ResponseHeader) -> bool {
        is_status_always_empty(head.status())
    }
}

impl EmptyBodyRule<RequestHeader> for GenericRule {
    fn is_content_always_empty(&mut self, _head: &RequestHeader) -> bool {
        false
    }
}

/// Status codes whose responses never have a body.
pub fn is_status_always_empty(status: StatusCode) -> bool {
    status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED
}
