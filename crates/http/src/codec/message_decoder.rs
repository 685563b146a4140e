//! The head-then-payload state machine shared by the request and response decoders.

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::{error, trace};

use crate::codec::body::PayloadDecoder;
use crate::codec::framing::decode_payload_size;
use crate::codec::{DecoderConfig, EmptyBodyRule};
use crate::protocol::{DecodeFailure, HttpHead, Message, ParseError};

/// Decodes one message at a time: a head through `D`, then the payload it frames.
///
/// Malformed input is reported in-band as a fatal [`Message::Failure`]; afterwards
/// every byte is discarded, since the next message boundary can no longer be found.
#[derive(Debug)]
pub(crate) struct MessageDecoder<D> {
    head_decoder: D,
    config: DecoderConfig,
    state: State,
}

#[derive(Debug)]
enum State {
    Head,
    Payload(PayloadDecoder),
    Failed,
}

impl<D, H> MessageDecoder<D>
where
    D: Decoder<Item = H, Error = ParseError>,
    H: HttpHead,
{
    pub(crate) fn new(head_decoder: D, config: DecoderConfig) -> Self {
        Self { head_decoder, config, state: State::Head }
    }

    /// Returns true between messages
    pub(crate) fn is_idle(&self) -> bool {
        matches!(self.state, State::Head)
    }

    pub(crate) fn decode_with<R>(&mut self, src: &mut BytesMut, rule: &mut R) -> Result<Option<Message<H>>, ParseError>
    where
        R: EmptyBodyRule<H> + ?Sized,
    {
        match &mut self.state {
            State::Failed => {
                src.clear();
                Ok(None)
            }

            State::Payload(payload_decoder) => match payload_decoder.decode(src) {
                Ok(Some(item)) => {
                    if item.is_last() {
                        // no need payload decoder in this message now
                        self.state = State::Head;
                    }
                    Ok(Some(Message::Payload(item)))
                }
                Ok(None) => Ok(None),
                Err(e) => Ok(Some(self.fail(None, e))),
            },

            State::Head => {
                let mut head = match self.head_decoder.decode(src) {
                    Ok(Some(head)) => head,
                    Ok(None) => return Ok(None),
                    Err(e) => return Ok(Some(self.fail(None, e))),
                };

                let always_empty = rule.is_content_always_empty(&head);
                match decode_payload_size(&mut head, &self.config, always_empty) {
                    Ok(payload_size) => {
                        trace!(?payload_size, "decoded message head");
                        self.state = State::Payload(payload_size.into());
                        Ok(Some(Message::Header(head)))
                    }
                    Err(e) => Ok(Some(self.fail(Some(head), e))),
                }
            }
        }
    }

    pub(crate) fn decode_eof_with<R>(
        &mut self,
        src: &mut BytesMut,
        rule: &mut R,
    ) -> Result<Option<Message<H>>, ParseError>
    where
        R: EmptyBodyRule<H> + ?Sized,
    {
        match &mut self.state {
            State::Failed => {
                src.clear();
                Ok(None)
            }

            State::Payload(payload_decoder) => match payload_decoder.decode_eof(src) {
                Ok(Some(item)) => {
                    if item.is_last() {
                        self.state = State::Head;
                    }
                    Ok(Some(Message::Payload(item)))
                }
                Ok(None) => {
                    self.state = State::Head;
                    Ok(None)
                }
                Err(e) => Ok(Some(self.fail(None, e))),
            },

            State::Head if src.is_empty() => Ok(None),

            State::Head => match self.decode_with(src, rule)? {
                Some(message) => Ok(Some(message)),
                None => Ok(Some(self.fail(None, ParseError::PrematureEnd))),
            },
        }
    }

    fn fail(&mut self, head: Option<H>, cause: ParseError) -> Message<H> {
        error!(cause = %cause, has_head = head.is_some(), "failed to decode http message");
        self.state = State::Failed;
        Message::Failure(DecodeFailure::fatal(head, cause))
    }
}
