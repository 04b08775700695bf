use async_trait::async_trait;
use factline_common::AggregateId;

use crate::{Checkpoint, CommittedEvent, DomainEvent, EventStoreError, Result, SequencedEvent, Version};

/// Page size used when replaying an aggregate's complete history.
pub const REPLAY_PAGE_SIZE: usize = 100;

/// Contract for a durable, append-only event log.
///
/// The log is keyed two ways: per aggregate by [`Version`] (gapless, starting
/// at 0) and globally by [`Checkpoint`]. All implementations must be
/// thread-safe; appends are atomic, either every event in the batch commits
/// or none do.
#[async_trait]
pub trait EventStore<E: DomainEvent>: Send + Sync {
    /// Appends events for one aggregate under an optimistic version check.
    ///
    /// `expected_version = None` means "create": fails [`Conflict`] when any
    /// event already exists for the aggregate. `Some(v)` means "update":
    /// fails [`NotFound`] when the aggregate has no history and [`Conflict`]
    /// when the latest persisted version differs from `v`.
    ///
    /// An empty `events` list with `None` is a [`Validation`] error (an
    /// aggregate cannot be created without history); with `Some(v)` it is a
    /// no-op success returning `v` unchanged.
    ///
    /// On success the events receive contiguous versions following the
    /// current latest, and the last inserted version is returned.
    ///
    /// [`Conflict`]: EventStoreError::Conflict
    /// [`NotFound`]: EventStoreError::NotFound
    /// [`Validation`]: EventStoreError::Validation
    async fn append_events(
        &self,
        expected_version: Option<Version>,
        aggregate_id: AggregateId,
        events: Vec<E>,
    ) -> Result<Version>;

    /// Reads an ascending, gapless slice of one aggregate's committed events.
    ///
    /// Returns events with version strictly greater than `after_version`
    /// (`None` reads from the start), capped at `max_count`. Fails
    /// [`NotFound`](EventStoreError::NotFound) when the aggregate has no
    /// committed history at all.
    async fn read_events(
        &self,
        aggregate_id: AggregateId,
        after_version: Option<Version>,
        max_count: usize,
    ) -> Result<Vec<CommittedEvent<E>>>;

    /// Polls the global log across all aggregates of this store.
    ///
    /// Returns events with checkpoint strictly greater than `after`,
    /// ascending by checkpoint, capped at `max_count`. This is the primitive
    /// the [`Subscription`](crate::Subscription) producer drives.
    async fn read_after(
        &self,
        after: Option<Checkpoint>,
        max_count: usize,
    ) -> Result<Vec<SequencedEvent<E>>>;
}

/// Checks that an append batch is well-formed before it reaches a backend.
///
/// Every event must carry the aggregate identity the append targets; a
/// mismatch means the caller built the batch against the wrong aggregate.
pub fn validate_events_for_append<E: DomainEvent>(
    aggregate_id: AggregateId,
    events: &[E],
) -> Result<()> {
    for event in events {
        if event.meta().aggregate_id != aggregate_id {
            return Err(EventStoreError::Validation(format!(
                "event {} targets aggregate {}, append targets {}",
                event.kind(),
                event.meta().aggregate_id,
                aggregate_id
            )));
        }
    }
    Ok(())
}

/// Convenience methods layered over any [`EventStore`].
#[async_trait]
pub trait EventStoreExt<E: DomainEvent>: EventStore<E> {
    /// Appends a single event.
    async fn append_event(
        &self,
        expected_version: Option<Version>,
        aggregate_id: AggregateId,
        event: E,
    ) -> Result<Version> {
        self.append_events(expected_version, aggregate_id, vec![event])
            .await
    }

    /// Returns whether the aggregate has any committed history.
    async fn aggregate_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        match self.read_events(aggregate_id, None, 1).await {
            Ok(_) => Ok(true),
            Err(EventStoreError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Reads an aggregate's complete committed history, paging until
    /// exhaustion.
    async fn read_all_events(&self, aggregate_id: AggregateId) -> Result<Vec<CommittedEvent<E>>> {
        let mut history = Vec::new();
        let mut after = None;
        loop {
            let page = self
                .read_events(aggregate_id, after, REPLAY_PAGE_SIZE)
                .await?;
            let exhausted = page.len() < REPLAY_PAGE_SIZE;
            if let Some(last) = page.last() {
                after = Some(last.version);
            }
            history.extend(page);
            if exhausted {
                return Ok(history);
            }
        }
    }
}

impl<E: DomainEvent, S: EventStore<E> + ?Sized> EventStoreExt<E> for S {}
