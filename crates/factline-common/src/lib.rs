//! Shared identifier types for the factline event-sourcing runtime.

pub mod ids;

pub use ids::{AggregateId, CorrelationId, EventId};
