//! # Lifecycle event channel.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] ring buffer. Agent tasks, the runtime and
//! subscriber workers publish into it; the runtime's listener is its only regular reader and
//! forwards each event to the [`AliveTracker`](crate::AliveTracker) and the
//! [`SubscriberSet`](crate::SubscriberSet).
//!
//! Publishing never waits. A reader that falls behind loses the oldest events and is told how
//! many through `RecvError::Lagged`. Events published while nobody listens are gone.

use tokio::sync::broadcast;

use super::event::Event;

/// Shared handle to the lifecycle channel. Clones publish into the same buffer.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a new bus with the given channel capacity (min 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes `ev`; dropped silently when there is no receiver.
    pub fn publish(&self, ev: Event) {
        tracing::trace!(kind = ev.kind.as_label(), seq = ev.seq, "lifecycle event");
        if self.tx.send(ev).is_err() {
            tracing::trace!("lifecycle event without receivers");
        }
    }

    /// New independent receiver; it sees only events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
