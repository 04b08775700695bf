use factline_store::DomainEvent;

use crate::command::Command;
use crate::projection::AggregateProjection;

/// Outcome of a successful decision: the events the command results in.
///
/// Zero events is a legitimate outcome: the command was already satisfied
/// and nothing needs to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision<E> {
    /// The facts to persist, in the order they happened.
    pub events: Vec<E>,
}

impl<E> Decision<E> {
    /// A decision that records nothing.
    pub fn noop() -> Self {
        Self { events: Vec::new() }
    }

    /// A decision recording the given facts.
    pub fn emit(events: Vec<E>) -> Self {
        Self { events }
    }

    /// A decision recording a single fact.
    pub fn record(event: E) -> Self {
        Self {
            events: vec![event],
        }
    }

    /// True when the decision records nothing.
    pub fn is_noop(&self) -> bool {
        self.events.is_empty()
    }
}

/// A finite-state-machine decider: the pure core of one aggregate type.
///
/// Implementors are closed enums with one variant per lifecycle state; the
/// `Default` value is the null (pre-creation) state every replay starts
/// from. A variant that does not support a given command must reject it with
/// an explicit "not supported in this state" [`Rejection`](FsmState::Rejection)
/// rather than silently doing nothing.
///
/// # Contract
///
/// - [`decide`](FsmState::decide) is a pure function of (state, command):
///   no I/O, no hidden randomness beyond what the command's
///   [`event_meta`](Command::event_meta) embeds. Rejections are domain
///   errors and are never persisted.
/// - [`evolve`](FsmState::evolve) is total and infallible: it is only ever
///   invoked with events a successful decision produced and the store
///   accepted.
/// - [`project`](FsmState::project) derives the public read model from the
///   current state.
pub trait FsmState: Default + Clone + Send + Sync + Sized {
    /// Commands this machine decides on.
    type Command: Command;

    /// Facts this machine produces and folds.
    type Event: DomainEvent;

    /// The public read model derived from this machine's state.
    type Projection: AggregateProjection;

    /// Domain-specific command rejection.
    type Rejection: std::error::Error + Send + Sync + 'static;

    /// Decides what events, if any, the command results in.
    fn decide(&self, command: &Self::Command) -> Result<Decision<Self::Event>, Self::Rejection>;

    /// Folds one event into the state, producing the next state.
    fn evolve(self, event: &Self::Event) -> Self;

    /// Derives the public projection of the current state.
    fn project(&self) -> Self::Projection;

    /// Decides and immediately folds the resulting events.
    ///
    /// Bypasses persistence, so this is for tests and simulations only;
    /// production paths go through the aggregate engine.
    fn decide_and_evolve(self, command: &Self::Command) -> Result<Self, Self::Rejection> {
        let decision = self.decide(command)?;
        Ok(decision.events.iter().fold(self, |state, event| state.evolve(event)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{TallyCommand, TallyRejection, TallyState};
    use factline_common::AggregateId;

    #[test]
    fn decision_constructors() {
        let noop: Decision<u8> = Decision::noop();
        assert!(noop.is_noop());

        let single = Decision::record(1u8);
        assert_eq!(single.events, vec![1]);
        assert!(!single.is_noop());

        let several = Decision::emit(vec![1u8, 2]);
        assert_eq!(several.events.len(), 2);
    }

    #[test]
    fn decide_and_evolve_folds_the_decision() {
        let id = AggregateId::new();
        let state = TallyState::default()
            .decide_and_evolve(&TallyCommand::start(id))
            .unwrap()
            .decide_and_evolve(&TallyCommand::add(id, 5))
            .unwrap()
            .decide_and_evolve(&TallyCommand::stop(id))
            .unwrap();
        assert_eq!(state.project().total, 5);
        assert!(state.project().stopped);

        // Stopping a stopped tally is already satisfied.
        let state = state.decide_and_evolve(&TallyCommand::stop(id)).unwrap();
        assert!(state.project().stopped);
    }

    #[test]
    fn decide_and_evolve_surfaces_rejections() {
        let id = AggregateId::new();
        let err = TallyState::default()
            .decide_and_evolve(&TallyCommand::add(id, 5))
            .unwrap_err();
        assert!(matches!(err, TallyRejection::NotStarted));
    }
}
