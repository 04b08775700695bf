use factline_common::AggregateId;
use thiserror::Error;

use crate::Version;

/// Errors produced by event store operations.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Optimistic-version mismatch: another writer committed first.
    ///
    /// `expected`/`actual` of `None` mean "no committed history"; a create
    /// append (`expected = None`) conflicts when history already exists.
    /// Callers must reload the aggregate and retry; the store never retries.
    #[error(
        "version conflict for aggregate {aggregate_id}: expected {expected:?}, actual {actual:?}"
    )]
    Conflict {
        aggregate_id: AggregateId,
        expected: Option<Version>,
        actual: Option<Version>,
    },

    /// The aggregate has no committed history.
    #[error("aggregate not found: {0}")]
    NotFound(AggregateId),

    /// Malformed request, e.g. a create append with zero events.
    #[error("invalid request: {0}")]
    Validation(String),

    /// An event failed to encode or decode at the serialization boundary.
    #[error("event codec error: {0}")]
    Codec(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A storage backend fault, typically transient.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl EventStoreError {
    /// True for optimistic-concurrency conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(self, EventStoreError::Conflict { .. })
    }

    /// True when the referenced aggregate has no committed history.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EventStoreError::NotFound(_))
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
