use std::num::NonZeroUsize;

use crate::protocol::ConfigError;

/// Default body limit, 1 MiB
pub const DEFAULT_MAX_CONTENT_LENGTH: NonZeroUsize = match NonZeroUsize::new(1024 * 1024) {
    Some(n) => n,
    None => panic!("default max content length must not be zero"),
};

/// Settings of a [`MessageAggregator`](crate::aggregate::MessageAggregator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    max_content_length: NonZeroUsize,
    close_on_expectation_failed: bool,
}

impl AggregatorConfig {
    /// Fails for a zero `max_content_length`.
    pub fn new(max_content_length: usize) -> Result<Self, ConfigError> {
        let max_content_length =
            NonZeroUsize::new(max_content_length).ok_or(ConfigError::InvalidMaxContentLength(max_content_length))?;
        Ok(Self { max_content_length, close_on_expectation_failed: false })
    }

    /// Close the connection after every 413 or 417 reply, even when it could be kept alive.
    pub fn with_close_on_expectation_failed(mut self, close: bool) -> Self {
        self.close_on_expectation_failed = close;
        self
    }

    pub fn max_content_length(&self) -> NonZeroUsize {
        self.max_content_length
    }

    pub fn close_on_expectation_failed(&self) -> bool {
        self.close_on_expectation_failed
    }

    /// Strictly greater than the limit; exactly the limit is fine.
    pub(crate) fn exceeds(&self, length: u64) -> bool {
        length > self.max_content_length.get() as u64
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self { max_content_length: DEFAULT_MAX_CONTENT_LENGTH, close_on_expectation_failed: false }
    }
}
