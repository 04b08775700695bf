use chrono::{DateTime, Utc};
use factline_common::{AggregateId, CorrelationId, EventId};
use serde::{Deserialize, Serialize};

/// Per-aggregate sequence number, used for optimistic concurrency control.
///
/// The first committed event of an aggregate is version 0; every later event
/// increments by exactly 1. Versions are assigned by the store at persistence
/// time, never by the caller, and are never reused or mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// The version assigned to an aggregate's first committed event.
    pub const FIRST: Version = Version(0);

    /// Creates a version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// Opaque resume token over a store's global event log.
///
/// Checkpoints are totally ordered and monotonically increasing across all
/// aggregates of one store. They carry no required relationship to any
/// aggregate's own [`Version`] sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checkpoint(u64);

impl Checkpoint {
    /// Creates a checkpoint from a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw checkpoint value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity and ordering metadata carried by every domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    /// The aggregate this fact belongs to.
    pub aggregate_id: AggregateId,

    /// Globally unique identity of this fact, generated once at creation.
    pub event_id: EventId,

    /// When the fact was decided.
    pub timestamp: DateTime<Utc>,

    /// Optional link to the causal chain that produced this fact.
    pub correlation_id: Option<CorrelationId>,
}

impl EventMeta {
    /// Stamps fresh metadata for an event of the given aggregate.
    pub fn for_aggregate(aggregate_id: AggregateId) -> Self {
        Self {
            aggregate_id,
            event_id: EventId::new(),
            timestamp: Utc::now(),
            correlation_id: None,
        }
    }

    /// Attaches a correlation ID.
    pub fn with_correlation(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// A domain event: an immutable fact about one aggregate.
///
/// Implementors are usually closed enums with one variant per fact kind.
/// The [`kind`](DomainEvent::kind) discriminator is what crosses the storage
/// boundary next to the encoded payload, and what feeds/filters key on.
pub trait DomainEvent: Clone + Send + Sync + 'static {
    /// Identity and ordering metadata of this fact.
    fn meta(&self) -> &EventMeta;

    /// The event-kind discriminator (e.g. `"AccountOpened"`).
    fn kind(&self) -> &'static str;
}

/// An event together with the per-aggregate version the store assigned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedEvent<E> {
    /// Version assigned at persistence time.
    pub version: Version,

    /// The committed fact.
    pub event: E,
}

/// An event as observed on the global feed: checkpoint, version, fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencedEvent<E> {
    /// Position on the store's global log.
    pub checkpoint: Checkpoint,

    /// Per-aggregate version of the fact.
    pub version: Version,

    /// The committed fact.
    pub event: E,
}
