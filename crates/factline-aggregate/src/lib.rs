//! FSM-backed aggregate engine for the factline event-sourcing runtime.
//!
//! A domain models its state machine once as an [`FsmState`] (pure
//! `decide`/`evolve`/`project` over a closed set of state variants) and the
//! engine does the rest: [`FsmAggregate`] serializes command handling per
//! handle and drives the optimistic-concurrency append protocol,
//! [`FsmAggregateStore`] creates and replays aggregates, and [`Aggregates`]
//! hides the create-vs-load branch from callers.

pub mod aggregate;
pub mod aggregates;
pub mod command;
pub mod error;
pub mod fsm;
pub mod projection;
pub mod store;

pub use aggregate::{ChangeResult, FsmAggregate};
pub use aggregates::Aggregates;
pub use command::Command;
pub use error::AggregateError;
pub use fsm::{Decision, FsmState};
pub use projection::{AggregateProjection, CommittedProjection};
pub use store::{FsmAggregateStore, NewAggregateResult};

#[cfg(test)]
pub(crate) mod fixtures;
