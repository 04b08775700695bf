//! Checkpointed polling subscription over a store's global log.
//!
//! A producer task polls [`EventStore::read_after`] and pushes non-empty
//! batches into an unbounded channel drained by the consumer. Delivery is
//! at-least-once; consumers are expected to be idempotent and to persist
//! their own checkpoint if they need to resume.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_core::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{Checkpoint, DomainEvent, EventStore, SequencedEvent};

/// Tuning knobs for the polling producer.
#[derive(Debug, Clone)]
pub struct SubscriptionOptions {
    /// Maximum events fetched per poll.
    pub batch_size: usize,

    /// Sleep after a poll that found nothing.
    pub idle_delay: Duration,

    /// Sleep after a failed poll before retrying.
    pub error_delay: Duration,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            idle_delay: Duration::from_secs(1),
            error_delay: Duration::from_secs(5),
        }
    }
}

impl SubscriptionOptions {
    /// Creates options with the battle-tested defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum events fetched per poll.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the idle backoff.
    pub fn idle_delay(mut self, idle_delay: Duration) -> Self {
        self.idle_delay = idle_delay;
        self
    }

    /// Sets the error backoff.
    pub fn error_delay(mut self, error_delay: Duration) -> Self {
        self.error_delay = error_delay;
        self
    }
}

/// A live subscription to a store's global event feed.
///
/// The stream never terminates on its own: an idle log means waiting, and a
/// transient store failure means backing off and retrying. It ends only when
/// the consumer calls [`cancel`](Subscription::cancel) or drops the handle,
/// either of which stops the producer task.
pub struct Subscription<E: DomainEvent> {
    receiver: mpsc::UnboundedReceiver<Vec<SequencedEvent<E>>>,
    producer: Option<JoinHandle<()>>,
}

impl<E: DomainEvent> Subscription<E> {
    /// Spawns the polling producer and returns the consumer handle.
    ///
    /// Polling starts strictly after `after_checkpoint` (`None` reads the
    /// log from its beginning).
    pub fn spawn(
        store: Arc<dyn EventStore<E>>,
        after_checkpoint: Option<Checkpoint>,
        options: SubscriptionOptions,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let producer = tokio::spawn(produce(store, after_checkpoint, options, sender));
        Self {
            receiver,
            producer: Some(producer),
        }
    }

    /// Waits for the next batch of events.
    ///
    /// Batches are non-empty and ascend by checkpoint, both within a batch
    /// and across batches. Returns `None` only after cancellation.
    pub async fn recv(&mut self) -> Option<Vec<SequencedEvent<E>>> {
        self.receiver.recv().await
    }

    /// Stops the producer task and waits for it to finish.
    pub async fn cancel(mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
            let _ = producer.await;
        }
    }
}

impl<E: DomainEvent> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

impl<E: DomainEvent> Stream for Subscription<E> {
    type Item = Vec<SequencedEvent<E>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

async fn produce<E: DomainEvent>(
    store: Arc<dyn EventStore<E>>,
    mut position: Option<Checkpoint>,
    options: SubscriptionOptions,
    sender: mpsc::UnboundedSender<Vec<SequencedEvent<E>>>,
) {
    loop {
        match store.read_after(position, options.batch_size).await {
            Ok(batch) if batch.is_empty() => {
                tokio::time::sleep(options.idle_delay).await;
            }
            Ok(batch) => {
                if let Some(last) = batch.last() {
                    position = Some(last.checkpoint);
                }
                metrics::counter!("subscription_events_delivered").increment(batch.len() as u64);
                if sender.send(batch).is_err() {
                    break;
                }
            }
            Err(err) => {
                // Transient by assumption: log, back off, keep the feed alive.
                tracing::warn!(error = %err, "subscription poll failed, backing off");
                tokio::time::sleep(options.error_delay).await;
            }
        }
    }
}

/// Spawning sugar for any concrete store behind an `Arc`.
pub trait EventStoreSubscribeExt<E: DomainEvent>: EventStore<E> + Sized + 'static {
    /// Subscribes to every event committed after `after_checkpoint`.
    fn subscribe_to_events(
        self: Arc<Self>,
        after_checkpoint: Option<Checkpoint>,
        options: SubscriptionOptions,
    ) -> Subscription<E> {
        Subscription::spawn(self, after_checkpoint, options)
    }
}

impl<E: DomainEvent, S: EventStore<E> + 'static> EventStoreSubscribeExt<E> for S {}
