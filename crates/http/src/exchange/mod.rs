//! Request/response correlation for one HTTP/1.1 connection.
//!
//! Responses arrive in request order, and some of them can only be framed by knowing
//! the request they answer. Each side pairs its decoder and encoder with an exchange
//! that queues the methods in flight:
//!
//! - [`ClientCodec`] / [`ClientExchange`]: request encoder, response decoder
//! - [`ServerCodec`] / [`ServerExchange`]: request decoder, response encoder
//!
//! Both codecs switch to forwarding [`Message::Opaque`](crate::protocol::Message::Opaque)
//! bytes after a tunnel or protocol upgrade.

mod client;
mod server;

pub use client::ClientCodec;
pub use client::ClientConfig;
pub use client::ClientExchange;
pub use server::ServerCodec;
pub use server::ServerExchange;
