use std::sync::Arc;

use factline_common::AggregateId;
use factline_store::EventStore;

use crate::aggregate::ChangeResult;
use crate::command::Command;
use crate::error::AggregateError;
use crate::fsm::FsmState;
use crate::projection::CommittedProjection;
use crate::store::FsmAggregateStore;

/// Stateless entry point for one aggregate type.
///
/// Routes each command to "create" or "load and handle" based on its
/// initializer flag, so callers never branch themselves. Holds no state of
/// its own; every call loads fresh from the log.
pub struct Aggregates<S, F> {
    store: FsmAggregateStore<S, F>,
}

impl<S, F> Aggregates<S, F>
where
    S: EventStore<F::Event>,
    F: FsmState,
{
    /// Creates the facade over the given event store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store: FsmAggregateStore::new(store),
        }
    }

    /// Handles one command end to end.
    ///
    /// Initializer commands create the aggregate; all others load it and
    /// run the decision against its committed state. Either way the caller
    /// gets the committed projection after the command plus the events that
    /// were appended.
    pub async fn handle(
        &self,
        command: F::Command,
    ) -> Result<ChangeResult<F::Projection, F::Event>, AggregateError<F::Rejection>> {
        if command.is_initializer() {
            let created = self.store.new_aggregate(command).await?;
            Ok(ChangeResult {
                committed: created.aggregate.committed_projection().await,
                events: created.events,
            })
        } else {
            let aggregate = self.store.load_aggregate(command.aggregate_id()).await?;
            aggregate.handle(command).await
        }
    }

    /// Point lookup: the committed projection of one aggregate.
    pub async fn get_by_id(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<CommittedProjection<F::Projection>, AggregateError<F::Rejection>> {
        let aggregate = self.store.load_aggregate(aggregate_id).await?;
        Ok(aggregate.committed_projection().await)
    }
}
