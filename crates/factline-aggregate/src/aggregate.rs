use std::sync::Arc;

use factline_common::AggregateId;
use factline_store::{EventStore, Version};
use tokio::sync::Mutex;

use crate::error::AggregateError;
use crate::fsm::FsmState;
use crate::projection::CommittedProjection;

/// Result of a handled command: the new committed projection plus the events
/// that were just appended (empty for a no-op decision).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeResult<P, E> {
    /// The projection and version after the command.
    pub committed: CommittedProjection<P>,

    /// The newly committed facts, for callers who want to publish them.
    pub events: Vec<E>,
}

/// The last known-good commit of one in-memory handle.
#[derive(Debug)]
struct Committed<F: FsmState> {
    version: Version,
    state: F,
}

impl<F: FsmState> Committed<F> {
    fn projection(&self) -> CommittedProjection<F::Projection> {
        CommittedProjection {
            projection: self.state.project(),
            version: self.version,
        }
    }
}

/// An in-memory handle to one aggregate, backed by an [`FsmState`] decider
/// and an event store.
///
/// The handle caches the last committed (version, state) pair; the durable
/// log remains the source of truth. A handle mutex serializes
/// [`handle`](FsmAggregate::handle) calls so no two decisions interleave
/// against the same snapshot. That lock protects this handle only; the
/// store's version check remains the consistency boundary across handles
/// and processes.
#[derive(Debug)]
pub struct FsmAggregate<S, F: FsmState> {
    store: Arc<S>,
    aggregate_id: AggregateId,
    committed: Mutex<Committed<F>>,
}

impl<S, F> FsmAggregate<S, F>
where
    S: EventStore<F::Event>,
    F: FsmState,
{
    /// Builds a handle by folding a committed history over the null state.
    ///
    /// `version` must be the version of the last event in `events`.
    pub(crate) fn from_history(
        store: Arc<S>,
        aggregate_id: AggregateId,
        version: Version,
        events: &[F::Event],
    ) -> Self {
        let state = events
            .iter()
            .fold(F::default(), |state, event| state.evolve(event));
        Self {
            store,
            aggregate_id,
            committed: Mutex::new(Committed { version, state }),
        }
    }

    /// The identity of the aggregate this handle caches.
    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    /// The current committed projection and version.
    pub async fn committed_projection(&self) -> CommittedProjection<F::Projection> {
        self.committed.lock().await.projection()
    }

    /// Decides the command, appends the resulting events under the
    /// committed version, and folds them in.
    ///
    /// The full decide→append→evolve sequence runs under the handle lock;
    /// the guard drops on every exit path. A rejected decision or a store
    /// failure leaves the committed state untouched; on
    /// [`Conflict`](factline_store::EventStoreError::Conflict) the caller
    /// reloads the aggregate and retries.
    pub async fn handle(
        &self,
        command: F::Command,
    ) -> Result<ChangeResult<F::Projection, F::Event>, AggregateError<F::Rejection>> {
        let mut committed = self.committed.lock().await;

        let decision = committed
            .state
            .decide(&command)
            .map_err(AggregateError::Rejected)?;

        if decision.is_noop() {
            return Ok(ChangeResult {
                committed: committed.projection(),
                events: Vec::new(),
            });
        }

        let new_version = self
            .store
            .append_events(
                Some(committed.version),
                self.aggregate_id,
                decision.events.clone(),
            )
            .await?;

        committed.state = decision
            .events
            .iter()
            .fold(committed.state.clone(), |state, event| state.evolve(event));
        committed.version = new_version;

        Ok(ChangeResult {
            committed: committed.projection(),
            events: decision.events,
        })
    }
}
