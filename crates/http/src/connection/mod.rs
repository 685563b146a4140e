//! Server connection driver.
//!
//! [`HttpConnection`] reads requests through an
//! [`AggregatedCodec`](crate::aggregate::AggregatedCodec) over a
//! [`ServerCodec`](crate::exchange::ServerCodec), hands each complete request to a
//! [`Handler`](crate::handler::Handler) and streams the response back.

mod http_connection;

pub use http_connection::HttpConnection;
