//! Message body length rules of [RFC 7230 Section 3.3.3](https://tools.ietf.org/html/rfc7230#section-3.3.3).
//!
//! Decoding derives the framing from the head just parsed; encoding derives it from the
//! head about to be written, and [`set_payload_size`] rewrites a head so that it announces
//! a given framing.

use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue};

use crate::codec::DecoderConfig;
use crate::protocol::{is_chunked, HeadKind, HttpHead, ParseError, PayloadSize};

/// Decide how the body following `head` is delimited.
///
/// `always_empty` is the verdict of the empty-body rule for responses (HEAD, 1xx, 204, 304, ...).
/// `Content-Length` is normalised in place to a single value.
pub(crate) fn decode_payload_size<H: HttpHead>(
    head: &mut H,
    config: &DecoderConfig,
    always_empty: bool,
) -> Result<PayloadSize, ParseError> {
    if always_empty {
        return Ok(PayloadSize::Empty);
    }

    let content_length = normalize_content_length(head.headers_mut(), config.allow_duplicate_content_lengths())?;

    match (head.headers().get(TRANSFER_ENCODING), content_length) {
        (Some(_), Some(_)) => {
            Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers"))
        }

        (te_value @ Some(_), None) => {
            if is_chunked(te_value) {
                Ok(PayloadSize::Chunked)
            } else if H::KIND == HeadKind::Request {
                // refer: https://www.rfc-editor.org/rfc/rfc9112.html#name-transfer-encoding
                Err(ParseError::invalid_header("request transfer-encoding must end with chunked"))
            } else {
                Ok(PayloadSize::UntilClose)
            }
        }

        (None, Some(length)) => Ok(PayloadSize::Length(length)),

        (None, None) => match H::KIND {
            HeadKind::Request => Ok(PayloadSize::Empty),
            HeadKind::Response => Ok(PayloadSize::UntilClose),
        },
    }
}

/// The framing an outgoing head announces. A head that announces nothing has its
/// body written as-is.
pub(crate) fn encode_payload_size<H: HttpHead>(head: &H) -> PayloadSize {
    if head.is_chunked() {
        return PayloadSize::Chunked;
    }
    match head.content_length() {
        Some(length) => PayloadSize::Length(length),
        None => PayloadSize::UntilClose,
    }
}

/// Collapse every `Content-Length` field into one value.
///
/// More than one value (repeated fields, comma separated lists, or a dangling comma)
/// is rejected unless `allow_duplicate` is set and all values are identical.
pub(crate) fn normalize_content_length(headers: &mut HeaderMap, allow_duplicate: bool) -> Result<Option<u64>, ParseError> {
    let mut values = Vec::new();
    for value in headers.get_all(CONTENT_LENGTH) {
        let value = value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;
        values.extend(value.split(',').map(str::trim));
    }

    let first = match values.as_slice() {
        [] => return Ok(None),
        [single] => *single,
        [first, rest @ ..] => {
            let all_equal = !first.is_empty() && rest.iter().all(|v| v == first);
            if !allow_duplicate || !all_equal {
                return Err(ParseError::multiple_content_length(values));
            }
            *first
        }
    };

    if first.is_empty() || !first.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::invalid_content_length(format!("value {first} is not u64")));
    }
    let length =
        first.parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {first} is not u64")))?;

    if values.len() > 1 {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }
    Ok(Some(length))
}

/// Set appropriate content length or transfer encoding header
pub fn set_payload_size(headers: &mut HeaderMap, payload_size: PayloadSize) {
    const CHUNKED_VALUE: HeaderValue = HeaderValue::from_static("chunked");
    const ZERO_VALUE: HeaderValue = HeaderValue::from_static("0");

    match payload_size {
        PayloadSize::Length(n) => {
            headers.remove(TRANSFER_ENCODING);
            headers.insert(CONTENT_LENGTH, n.into());
        }
        PayloadSize::Chunked => {
            headers.remove(CONTENT_LENGTH);
            headers.insert(TRANSFER_ENCODING, CHUNKED_VALUE);
        }
        PayloadSize::Empty => {
            headers.remove(TRANSFER_ENCODING);
            headers.insert(CONTENT_LENGTH, ZERO_VALUE);
        }
        PayloadSize::UntilClose => {
            headers.remove(TRANSFER_ENCODING);
            headers.remove(CONTENT_LENGTH);
        }
    }
}
