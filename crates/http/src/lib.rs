//! HTTP/1.1 message framing on top of tokio codecs
//!
//! This crate sits between a byte stream and an application. It tokenizes HTTP/1.1
//! messages into framing events, aggregates the events of a message into one complete
//! message under a size limit, handles `Expect: 100-continue`, and correlates responses
//! with the requests they answer so that `HEAD` and `CONNECT` exchanges are framed correctly.
//!
//! # Features
//!
//! - Streaming request and response decoders with `Content-Length`, chunked (with trailers)
//!   and close-delimited bodies
//! - Malformed input reported as failure markers attached to the message, not dropped
//! - Bounded aggregation with `100 Continue`, `413` and `417` replies
//! - Selective aggregation through a predicate
//! - Client and server codecs sharing per-connection request/response state
//! - A small server connection driver for aggregated requests
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{Request, Response, StatusCode};
//! use http_body_util::Full;
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn, Level};
//! use tracing_subscriber::FmtSubscriber;
//! use micro_framing::connection::HttpConnection;
//! use micro_framing::handler::make_handler;
//!
//! #[tokio::main]
//! async fn main() {
//!     let subscriber = FmtSubscriber::builder()
//!         .with_max_level(Level::INFO)
//!         .finish();
//!     tracing::subscriber::set_global_default(subscriber)
//!         .expect("setting default subscriber failed");
//!
//!     info!(port = 8080, "start listening");
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!
//!         tokio::spawn(async move {
//!             let connection = HttpConnection::new(tcp_stream);
//!             match connection.process(handler).await {
//!                 Ok(_) => info!("finished process, connection shutdown"),
//!                 Err(e) => error!("service has error, cause {}, connection shutdown", e),
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(request: Request<Bytes>) -> Result<Response<Full<Bytes>>, Infallible> {
//!     info!(path = request.uri().path(), body_len = request.body().len(), "receiving request");
//!
//!     let mut response = Response::new(Full::new(Bytes::from_static(b"Hello World!\r\n")));
//!     *response.status_mut() = StatusCode::OK;
//!     Ok(response)
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: framing events, heads, aggregated messages and errors
//! - [`codec`]: HTTP/1.1 tokenizers and serializers
//! - [`aggregate`]: the continuation gate and the message aggregator
//! - [`exchange`]: client and server codecs with request/response correlation
//! - [`handler`]: request handler traits
//! - [`connection`]: the server connection driver
//!
//! # Errors
//!
//! Per-message problems travel with the message: a decoder emits
//! [`protocol::Message::Failure`], and the aggregator turns it into a
//! [`protocol::FullMessage`] whose [`failure`](protocol::FullMessage::failure) is set.
//! `Err` values are connection-fatal:
//!
//! - [`protocol::HttpError`]: top-level error type
//! - [`protocol::ParseError`]: tokenizer errors
//! - [`protocol::SendError`]: encoder errors
//! - [`protocol::AggregateError`]: aggregation errors that end the connection
//! - [`protocol::ExchangeError`]: requests left unanswered when the connection closed
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - No TLS support
//! - Default maximum header size: 8KB
//! - Default maximum number of headers: 64

pub mod aggregate;
pub mod codec;
pub mod connection;
pub mod exchange;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
