use factline_common::AggregateId;
use factline_store::EventStoreError;
use thiserror::Error;

/// Errors surfaced by the aggregate engine, generic over the FSM's own
/// rejection type.
#[derive(Debug, Error)]
pub enum AggregateError<R>
where
    R: std::error::Error + Send + Sync + 'static,
{
    /// The domain decision refused the command. Nothing was persisted and
    /// the in-memory handle is unchanged.
    #[error("command rejected: {0}")]
    Rejected(R),

    /// A non-initializer command was routed to aggregate creation.
    #[error("command for aggregate {0} is not an initializer")]
    NotInitializer(AggregateId),

    /// The initializing decision produced no events; an aggregate cannot be
    /// born without history.
    #[error("initializer decision for aggregate {0} produced no events")]
    EmptyCreation(AggregateId),

    /// A store-level failure, propagated untouched. On `Conflict` the caller
    /// reloads the aggregate and retries; the engine never retries itself.
    #[error(transparent)]
    Store(#[from] EventStoreError),
}

impl<R> AggregateError<R>
where
    R: std::error::Error + Send + Sync + 'static,
{
    /// True when the store reported an optimistic-version conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, AggregateError::Store(err) if err.is_conflict())
    }

    /// True when the referenced aggregate has no committed history.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AggregateError::Store(err) if err.is_not_found())
    }
}
