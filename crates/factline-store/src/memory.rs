use std::marker::PhantomData;
use std::sync::Arc;

use factline_common::{AggregateId, EventId};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;

use crate::codec::{DecodePolicy, EventCodec, JsonEventCodec};
use crate::store::validate_events_for_append;
use crate::{
    Checkpoint, CommittedEvent, DomainEvent, EventStore, EventStoreError, Result, SequencedEvent,
    Version,
};

/// One encoded row of the log. Events are stored the way they would cross
/// any backend boundary: kind discriminator plus payload bytes.
#[derive(Debug, Clone)]
struct StoredRecord {
    sequence: u64,
    aggregate_id: AggregateId,
    event_id: EventId,
    kind: String,
    payload: Vec<u8>,
    version: i64,
}

#[derive(Debug, Default)]
struct Log {
    next_sequence: u64,
    records: Vec<StoredRecord>,
}

/// In-memory reference binding of the [`EventStore`] contract.
///
/// Implements the full append/read/feed semantics over a vector of encoded
/// records, exercising the codec on both sides of the boundary. Cloning is
/// cheap and clones share the same log, so one store can back several
/// handles and a subscription at once.
pub struct MemoryEventStore<E, C = JsonEventCodec> {
    log: Arc<RwLock<Log>>,
    codec: Arc<C>,
    decode_policy: DecodePolicy,
    _marker: PhantomData<fn() -> E>,
}

impl<E, C> Clone for MemoryEventStore<E, C> {
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
            codec: Arc::clone(&self.codec),
            decode_policy: self.decode_policy,
            _marker: PhantomData,
        }
    }
}

impl<E, C> std::fmt::Debug for MemoryEventStore<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEventStore")
            .field("decode_policy", &self.decode_policy)
            .finish_non_exhaustive()
    }
}

impl<E> MemoryEventStore<E, JsonEventCodec>
where
    E: DomainEvent + Serialize + DeserializeOwned,
{
    /// Creates an empty store with the JSON codec.
    pub fn new() -> Self {
        Self::with_codec(JsonEventCodec::new())
    }
}

impl<E> Default for MemoryEventStore<E, JsonEventCodec>
where
    E: DomainEvent + Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, C> MemoryEventStore<E, C>
where
    E: DomainEvent,
    C: EventCodec<E>,
{
    /// Creates an empty store over a custom codec.
    pub fn with_codec(codec: C) -> Self {
        Self {
            log: Arc::new(RwLock::new(Log::default())),
            codec: Arc::new(codec),
            decode_policy: DecodePolicy::default(),
            _marker: PhantomData,
        }
    }

    /// Sets the decode policy applied to the global feed.
    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    /// Total number of records in the log.
    pub async fn event_count(&self) -> usize {
        self.log.read().await.records.len()
    }

    /// Drops every record. The global sequence is not rewound; checkpoints
    /// are never reused.
    pub async fn clear(&self) {
        self.log.write().await.records.clear();
    }

    fn decode_record(&self, record: &StoredRecord) -> Result<E> {
        self.codec.decode(&record.kind, &record.payload)
    }
}

#[async_trait::async_trait]
impl<E, C> EventStore<E> for MemoryEventStore<E, C>
where
    E: DomainEvent,
    C: EventCodec<E>,
{
    async fn append_events(
        &self,
        expected_version: Option<Version>,
        aggregate_id: AggregateId,
        events: Vec<E>,
    ) -> Result<Version> {
        validate_events_for_append(aggregate_id, &events)?;

        if events.is_empty() {
            return match expected_version {
                None => Err(EventStoreError::Validation(format!(
                    "cannot create aggregate {aggregate_id} without a first event"
                ))),
                Some(version) => Ok(version),
            };
        }

        let mut log = self.log.write().await;

        let current = log
            .records
            .iter()
            .filter(|r| r.aggregate_id == aggregate_id)
            .map(|r| r.version)
            .max();

        match (expected_version, current) {
            (None, Some(actual)) => {
                return Err(EventStoreError::Conflict {
                    aggregate_id,
                    expected: None,
                    actual: Some(Version::new(actual)),
                });
            }
            (Some(_), None) => return Err(EventStoreError::NotFound(aggregate_id)),
            (Some(expected), Some(actual)) if expected.as_i64() != actual => {
                return Err(EventStoreError::Conflict {
                    aggregate_id,
                    expected: Some(expected),
                    actual: Some(Version::new(actual)),
                });
            }
            _ => {}
        }

        // Event identities are assigned once at creation and never reused.
        for event in &events {
            let event_id = event.meta().event_id;
            if log.records.iter().any(|r| r.event_id == event_id) {
                return Err(EventStoreError::Validation(format!(
                    "event {event_id} is already committed"
                )));
            }
        }

        // Encode up front so a codec failure appends nothing.
        let mut encoded = Vec::with_capacity(events.len());
        for event in &events {
            encoded.push(self.codec.encode(event)?);
        }

        let start_version = current.map(|v| v + 1).unwrap_or(0);
        for (index, (event, payload)) in events.iter().zip(encoded).enumerate() {
            let sequence = log.next_sequence + 1;
            log.next_sequence = sequence;
            log.records.push(StoredRecord {
                sequence,
                aggregate_id,
                event_id: event.meta().event_id,
                kind: event.kind().to_string(),
                payload,
                version: start_version + index as i64,
            });
        }

        let last_version = Version::new(start_version + events.len() as i64 - 1);
        metrics::counter!("event_store_events_appended").increment(events.len() as u64);
        tracing::debug!(%aggregate_id, version = %last_version, count = events.len(), "appended events");

        Ok(last_version)
    }

    async fn read_events(
        &self,
        aggregate_id: AggregateId,
        after_version: Option<Version>,
        max_count: usize,
    ) -> Result<Vec<CommittedEvent<E>>> {
        let log = self.log.read().await;

        let mut records: Vec<StoredRecord> = log
            .records
            .iter()
            .filter(|r| r.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        if records.is_empty() {
            return Err(EventStoreError::NotFound(aggregate_id));
        }
        records.sort_by_key(|r| r.version);

        let floor = after_version.map(|v| v.as_i64()).unwrap_or(-1);
        let mut events = Vec::new();
        // Replay reads always fail fast on decode: a skipped event would
        // leave a version gap and a nondeterministic fold.
        for record in records.into_iter().filter(|r| r.version > floor).take(max_count) {
            events.push(CommittedEvent {
                version: Version::new(record.version),
                event: self.decode_record(&record)?,
            });
        }
        Ok(events)
    }

    async fn read_after(
        &self,
        after: Option<Checkpoint>,
        max_count: usize,
    ) -> Result<Vec<SequencedEvent<E>>> {
        let log = self.log.read().await;

        let floor = after.map(|c| c.as_u64()).unwrap_or(0);
        let mut batch = Vec::new();
        for record in log.records.iter().filter(|r| r.sequence > floor) {
            if batch.len() == max_count {
                break;
            }
            match self.decode_record(record) {
                Ok(event) => batch.push(SequencedEvent {
                    checkpoint: Checkpoint::new(record.sequence),
                    version: Version::new(record.version),
                    event,
                }),
                Err(err) => match self.decode_policy {
                    DecodePolicy::FailFast => return Err(err),
                    DecodePolicy::SkipAndLog => {
                        tracing::warn!(
                            sequence = record.sequence,
                            kind = %record.kind,
                            error = %err,
                            "dropping undecodable event from feed"
                        );
                    }
                },
            }
        }
        Ok(batch)
    }
}
