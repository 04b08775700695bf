use std::marker::PhantomData;
use std::sync::Arc;

use factline_common::AggregateId;
use factline_store::{EventStore, EventStoreError, EventStoreExt};

use crate::aggregate::FsmAggregate;
use crate::command::Command;
use crate::error::AggregateError;
use crate::fsm::FsmState;

/// Result of creating a new aggregate: a ready handle plus the events that
/// were produced and persisted on creation, for callers who want to publish
/// them.
#[derive(Debug)]
pub struct NewAggregateResult<S, F: FsmState> {
    /// The aggregate, ready to handle further commands.
    pub aggregate: FsmAggregate<S, F>,

    /// The creation events, in committed order.
    pub events: Vec<F::Event>,
}

/// Creates new aggregates and replays existing ones from the event store.
pub struct FsmAggregateStore<S, F> {
    store: Arc<S>,
    _marker: PhantomData<fn() -> F>,
}

impl<S, F> FsmAggregateStore<S, F>
where
    S: EventStore<F::Event>,
    F: FsmState,
{
    /// Creates an aggregate store over the given event store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Returns the underlying event store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Creates a brand-new aggregate from its initializing command.
    ///
    /// The decision runs against the null state and its events are appended
    /// with the "must not exist" sentinel, so a second creation of the same
    /// identity fails [`Conflict`](EventStoreError::Conflict). A decision
    /// that produces no events fails
    /// [`EmptyCreation`](AggregateError::EmptyCreation) before touching the
    /// store.
    pub async fn new_aggregate(
        &self,
        command: F::Command,
    ) -> Result<NewAggregateResult<S, F>, AggregateError<F::Rejection>> {
        let aggregate_id = command.aggregate_id();
        if !command.is_initializer() {
            return Err(AggregateError::NotInitializer(aggregate_id));
        }

        let null_state = F::default();
        let decision = null_state
            .decide(&command)
            .map_err(AggregateError::Rejected)?;
        if decision.is_noop() {
            return Err(AggregateError::EmptyCreation(aggregate_id));
        }

        let version = self
            .store
            .append_events(None, aggregate_id, decision.events.clone())
            .await?;
        tracing::debug!(%aggregate_id, %version, "created aggregate");

        Ok(NewAggregateResult {
            aggregate: FsmAggregate::from_history(
                Arc::clone(&self.store),
                aggregate_id,
                version,
                &decision.events,
            ),
            events: decision.events,
        })
    }

    /// Replays an existing aggregate into a ready handle.
    ///
    /// Reads the complete committed history (paged to exhaustion) and folds
    /// it over the null state. Fails
    /// [`NotFound`](EventStoreError::NotFound) when the identity has no
    /// committed history. Every load is a full replay; snapshotting is an
    /// external optimization.
    pub async fn load_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<FsmAggregate<S, F>, AggregateError<F::Rejection>> {
        let history = self.store.read_all_events(aggregate_id).await?;
        let version = history
            .last()
            .map(|committed| committed.version)
            .ok_or(EventStoreError::NotFound(aggregate_id))?;
        let events: Vec<F::Event> = history.into_iter().map(|committed| committed.event).collect();

        Ok(FsmAggregate::from_history(
            Arc::clone(&self.store),
            aggregate_id,
            version,
            &events,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{TallyCommand, TallyEvent, TallyState};
    use crate::projection::AggregateProjection;
    use factline_store::{DomainEvent, MemoryEventStore, Version};

    fn tally_store(
        store: Arc<MemoryEventStore<TallyEvent>>,
    ) -> FsmAggregateStore<MemoryEventStore<TallyEvent>, TallyState> {
        FsmAggregateStore::new(store)
    }

    #[tokio::test]
    async fn new_aggregate_persists_the_creation_events() {
        let store = Arc::new(MemoryEventStore::<TallyEvent>::new());
        let aggregates = tally_store(Arc::clone(&store));
        let id = AggregateId::new();

        let created = aggregates
            .new_aggregate(TallyCommand::start(id))
            .await
            .unwrap();
        assert_eq!(created.events.len(), 1);
        assert_eq!(created.events[0].kind(), "TallyStarted");

        let committed = created.aggregate.committed_projection().await;
        assert_eq!(committed.version, Version::FIRST);
        assert_eq!(committed.projection.aggregate_id(), id);
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn new_aggregate_rejects_non_initializer_commands() {
        let store = Arc::new(MemoryEventStore::<TallyEvent>::new());
        let aggregates = tally_store(store);
        let id = AggregateId::new();

        let err = aggregates
            .new_aggregate(TallyCommand::add(id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AggregateError::NotInitializer(found) if found == id));
    }

    #[tokio::test]
    async fn creating_the_same_identity_twice_conflicts() {
        let store = Arc::new(MemoryEventStore::<TallyEvent>::new());
        let aggregates = tally_store(store);
        let id = AggregateId::new();

        aggregates
            .new_aggregate(TallyCommand::start(id))
            .await
            .unwrap();
        let err = aggregates
            .new_aggregate(TallyCommand::start(id))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn load_aggregate_replays_the_full_history() {
        let store = Arc::new(MemoryEventStore::<TallyEvent>::new());
        let aggregates = tally_store(Arc::clone(&store));
        let id = AggregateId::new();

        let created = aggregates
            .new_aggregate(TallyCommand::start(id))
            .await
            .unwrap();
        created
            .aggregate
            .handle(TallyCommand::add(id, 3))
            .await
            .unwrap();
        created
            .aggregate
            .handle(TallyCommand::add(id, 4))
            .await
            .unwrap();

        let loaded = aggregates.load_aggregate(id).await.unwrap();
        let committed = loaded.committed_projection().await;
        assert_eq!(committed.version, Version::new(2));
        assert_eq!(committed.projection.total, 7);
    }

    #[tokio::test]
    async fn load_aggregate_of_unknown_identity_is_not_found() {
        let store = Arc::new(MemoryEventStore::<TallyEvent>::new());
        let aggregates = tally_store(store);

        let err = aggregates
            .load_aggregate(AggregateId::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn load_replays_histories_longer_than_one_page() {
        let store = Arc::new(MemoryEventStore::<TallyEvent>::new());
        let aggregates = tally_store(Arc::clone(&store));
        let id = AggregateId::new();

        let created = aggregates
            .new_aggregate(TallyCommand::start(id))
            .await
            .unwrap();
        let additions = factline_store::REPLAY_PAGE_SIZE + 25;
        for _ in 0..additions {
            created
                .aggregate
                .handle(TallyCommand::add(id, 1))
                .await
                .unwrap();
        }

        let loaded = aggregates.load_aggregate(id).await.unwrap();
        let committed = loaded.committed_projection().await;
        assert_eq!(committed.projection.total, additions as u64);
        assert_eq!(committed.version, Version::new(additions as i64));
    }

    #[tokio::test]
    async fn initializer_with_an_empty_decision_is_rejected_before_the_store() {
        let store = Arc::new(MemoryEventStore::<TallyEvent>::new());
        let aggregates = tally_store(Arc::clone(&store));
        let id = AggregateId::new();

        let err = aggregates
            .new_aggregate(TallyCommand::start_idle(id))
            .await
            .unwrap_err();
        assert!(matches!(err, AggregateError::EmptyCreation(found) if found == id));
        assert_eq!(store.event_count().await, 0);
    }
}
