use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::header::CONNECTION;
use http::{HeaderMap, HeaderValue, Response, StatusCode, Version};
use http_body::Body;
use http_body_util::{BodyExt, Empty};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, warn};

use crate::aggregate::{AggregatedCodec, Aggregated, AggregatorConfig, Reply};
use crate::codec::{set_payload_size, DecoderConfig};
use crate::exchange::ServerCodec;
use crate::handler::Handler;
use crate::protocol::{
    HttpError, HttpHead, Message, ParseError, PayloadItem, PayloadSize, RequestHeader, ResponseHeader, SendError,
};

/// Serves one HTTP/1.1 connection, one aggregated request at a time.
///
/// Interim and rejection replies produced while aggregating (`100`, `413`, `417`) are
/// written before the handler sees anything. Requests that failed to decode are answered
/// with `400 Bad Request` and end the connection.
#[derive(Debug)]
pub struct HttpConnection<IO> {
    framed: Framed<IO, AggregatedCodec<ServerCodec, RequestHeader>>,
}

impl<IO> HttpConnection<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: IO) -> Self {
        Self::with_config(io, AggregatorConfig::default(), DecoderConfig::default())
    }

    pub fn with_config(io: IO, aggregator_config: AggregatorConfig, decoder_config: DecoderConfig) -> Self {
        let codec = AggregatedCodec::new(ServerCodec::with_config(decoder_config), aggregator_config);
        Self { framed: Framed::with_capacity(io, codec, 8 * 1024) }
    }

    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        loop {
            match self.framed.next().await {
                Some(Ok(Aggregated::Reply(reply))) => {
                    let close = reply.is_close();
                    self.send_reply(reply).await?;
                    if close {
                        info!("reply requires closing the connection");
                        return Ok(());
                    }
                }

                Some(Ok(Aggregated::Message(full))) => {
                    if let Some(cause) = full.failure() {
                        warn!(cause = %cause, "request failed to decode, replying 400");
                        self.send_bad_request().await?;
                        return Ok(());
                    }

                    let keep_alive = full.head().is_keep_alive();
                    let version = full.head().version();
                    let response = handler.call(full.into_request()).await;
                    self.send_response(response, keep_alive, version).await?;

                    if !keep_alive {
                        debug!("request is not keep-alive, connection shutdown");
                        return Ok(());
                    }
                }

                Some(Ok(Aggregated::Forward(Message::Failure(failure)))) => {
                    warn!(cause = %failure.cause(), "can't decode request head, replying 400");
                    self.send_bad_request().await?;
                    return Ok(());
                }

                Some(Ok(Aggregated::Forward(_))) => {
                    error!("received a message outside of any request");
                    return Err(ParseError::invalid_body("unexpected message outside of a request").into());
                }

                Some(Err(e)) => {
                    error!(cause = %e, "can't receive next request");
                    if let Err(send_error) = self.send_bad_request().await {
                        debug!(cause = %send_error, "failed to write 400 response");
                    }
                    return Err(e);
                }

                None => {
                    info!("cant read more request, break this connection down");
                    return Ok(());
                }
            }
        }
    }

    async fn send_reply(&mut self, reply: Reply) -> Result<(), HttpError> {
        debug!(status = %reply.status(), close = reply.is_close(), "writing reply");
        self.framed.send(reply.into_head()).await
    }

    async fn send_bad_request(&mut self) -> Result<(), HttpError> {
        let mut head = ResponseHeader::empty(StatusCode::BAD_REQUEST);
        head.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
        self.framed.send(head).await
    }

    async fn send_response<T, E>(
        &mut self,
        response_result: Result<Response<T>, E>,
        keep_alive: bool,
        version: Version,
    ) -> Result<(), HttpError>
    where
        T: Body<Data = Bytes> + Unpin,
        T::Error: Display,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        match response_result {
            Ok(response) => self.do_send_response(response, keep_alive, version).await,
            Err(e) => {
                error!("handle response error, cause: {}", e.into());
                let error_response = build_error_response(StatusCode::INTERNAL_SERVER_ERROR);
                self.do_send_response(error_response, keep_alive, version).await
            }
        }
    }

    async fn do_send_response<T>(&mut self, response: Response<T>, keep_alive: bool, version: Version) -> Result<(), HttpError>
    where
        T: Body<Data = Bytes> + Unpin,
        T::Error: Display,
    {
        let (parts, mut body) = response.into_parts();
        let mut head = ResponseHeader::from(parts);
        *head.as_mut().version_mut() = version;

        let payload_size = match body.size_hint().exact() {
            Some(0) => PayloadSize::Empty,
            Some(length) => PayloadSize::Length(length),
            None if version == Version::HTTP_10 => PayloadSize::UntilClose,
            None => PayloadSize::Chunked,
        };
        set_payload_size(head.headers_mut(), payload_size);
        if !keep_alive && version == Version::HTTP_11 {
            head.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
        }

        // feed instead of send: the head is flushed together with the first chunk
        self.framed.feed(Message::<_, Bytes>::Header(head)).await?;

        let mut trailers = HeaderMap::new();
        loop {
            match body.frame().await {
                Some(Ok(frame)) => match frame.into_data() {
                    Ok(data) => self.framed.send(Message::<ResponseHeader>::Payload(PayloadItem::Chunk(data))).await?,
                    Err(frame) => {
                        if let Ok(frame_trailers) = frame.into_trailers() {
                            trailers.extend(frame_trailers);
                        }
                    }
                },
                Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve response body error: {e}")).into()),
                None => {
                    let last = PayloadItem::Last { data: Bytes::new(), trailers };
                    return self.framed.send(Message::<ResponseHeader>::Payload(last)).await;
                }
            }
        }
    }
}

fn build_error_response(status_code: StatusCode) -> Response<Empty<Bytes>> {
    let mut response = Response::new(Empty::<Bytes>::new());
    *response.status_mut() = status_code;
    response
}
