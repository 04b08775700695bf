use factline_common::{AggregateId, CorrelationId};
use factline_store::EventMeta;

/// A request to change an aggregate's state.
///
/// Commands are never persisted; only the events a decision produces are.
/// Exactly one command in an aggregate's life is the initializer: the one
/// that brings the aggregate into existence.
pub trait Command: Send + Sync {
    /// The aggregate this command targets.
    fn aggregate_id(&self) -> AggregateId;

    /// True only for the command that creates a brand-new aggregate.
    fn is_initializer(&self) -> bool {
        false
    }

    /// The causal chain this command belongs to, if any.
    fn correlation_id(&self) -> Option<CorrelationId> {
        None
    }

    /// Stamps metadata for the events this command's decision produces.
    ///
    /// Called by `decide` implementations; any randomness (the event ID) and
    /// the timestamp enter the decision through this value.
    fn event_meta(&self) -> EventMeta {
        let meta = EventMeta::for_aggregate(self.aggregate_id());
        match self.correlation_id() {
            Some(correlation_id) => meta.with_correlation(correlation_id),
            None => meta,
        }
    }
}
