/// Chooses, per message head, whether the message is aggregated or forwarded as-is.
///
/// Consulted once for every new head; the answer only applies to that message.
#[cfg_attr(test, mockall::automock)]
pub trait AggregationPredicate<T> {
    fn should_aggregate(&mut self, head: &T) -> bool;
}

/// Aggregates every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateAll;

impl<T> AggregationPredicate<T> for AggregateAll {
    fn should_aggregate(&mut self, _head: &T) -> bool {
        true
    }
}

impl<T, F> AggregationPredicate<T> for F
where
    F: FnMut(&T) -> bool,
{
    fn should_aggregate(&mut self, head: &T) -> bool {
        self(head)
    }
}
