//! Aggregation of streamed HTTP messages into complete ones.
//!
//! - [`ContinuationGate`]: answers `Expect` and rejects bodies declared too large
//! - [`MessageAggregator`]: buffers the chunks of one message at a time under a size limit
//! - [`AggregatedCodec`]: runs an aggregator over any codec producing framing events
//! - [`AggregationPredicate`]: chooses which messages are aggregated

mod aggregator;
mod buffer;
mod codec;
mod config;
mod gate;
mod predicate;

pub use aggregator::Aggregated;
pub use aggregator::MessageAggregator;
pub use codec::AggregatedCodec;
pub use config::AggregatorConfig;
pub use config::DEFAULT_MAX_CONTENT_LENGTH;
pub use gate::Admission;
pub use gate::ContinuationGate;
pub use gate::Reply;
pub use predicate::AggregateAll;
pub use predicate::AggregationPredicate;
#[cfg(test)]
pub use predicate::MockAggregationPredicate;
