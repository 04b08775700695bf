//! Serialization boundary between domain events and a storage backend.
//!
//! Events cross a backend only as a kind discriminator plus a byte payload;
//! the runtime is agnostic to the encoding.

use serde::{Serialize, de::DeserializeOwned};

use crate::{DomainEvent, EventStoreError, Result};

/// Encodes domain events to bytes and back.
///
/// A backend stores `(event.kind(), encode(event))` pairs and reconstructs
/// events via [`decode`](EventCodec::decode). Codecs must be deterministic:
/// decoding what encode produced yields an equal event.
pub trait EventCodec<E>: Send + Sync {
    /// Encodes an event payload to bytes.
    fn encode(&self, event: &E) -> Result<Vec<u8>>;

    /// Decodes an event payload from its kind discriminator and bytes.
    fn decode(&self, kind: &str, bytes: &[u8]) -> Result<E>;
}

/// What a read path does with an event that fails to decode.
///
/// Replay reads ([`EventStore::read_events`](crate::EventStore::read_events))
/// always fail fast regardless of policy, since skipping would leave version
/// gaps and make replay nondeterministic. The policy governs the global feed
/// only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Surface the codec error to the caller.
    #[default]
    FailFast,

    /// Drop the event from the feed and log a warning.
    SkipAndLog,
}

/// serde_json-backed codec for any serde-enabled event type.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEventCodec;

impl JsonEventCodec {
    /// Creates the codec.
    pub fn new() -> Self {
        Self
    }
}

impl<E> EventCodec<E> for JsonEventCodec
where
    E: DomainEvent + Serialize + DeserializeOwned,
{
    fn encode(&self, event: &E) -> Result<Vec<u8>> {
        serde_json::to_vec(event).map_err(|err| EventStoreError::Codec(Box::new(err)))
    }

    fn decode(&self, _kind: &str, bytes: &[u8]) -> Result<E> {
        serde_json::from_slice(bytes).map_err(|err| EventStoreError::Codec(Box::new(err)))
    }
}
