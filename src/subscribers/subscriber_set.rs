//! # Lifecycle event fan-out.
//!
//! [`SubscriberSet`] hands every lifecycle [`Event`] to each registered [`Subscribe`] impl
//! through its own bounded queue and worker task, so the runtime's listener never waits on
//! a subscriber.
//!
//! ```text
//! emit(ev) ──try_send──► queue(LogWriter) ──► worker ──► on_event
//!          ──try_send──► queue(metrics)   ──► worker ──► on_event
//!                              │ full/closed           │ panic
//!                              ▼                       ▼
//!                      SubscriberOverflow      SubscriberPanicked
//! ```
//!
//! Each subscriber sees events in emission order; there is no ordering between subscribers.
//! A dropped or panicking delivery affects only that subscriber, and its worker keeps going.
//! Overflow of an overflow event is not reported again, and a subscriber never receives the
//! report of its own panic.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::events::{Event, EventBus, EventKind};
use crate::subscribers::Subscribe;

struct Lane {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Delivers lifecycle events to subscriber workers.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    workers: Vec<JoinHandle<()>>,
    events: EventBus,
}

/// Renders a panic payload for a `*Panicked` event.
pub(crate) fn panic_info(payload: &(dyn std::any::Any + Send)) -> String {
    match payload.downcast_ref::<&'static str>() {
        Some(msg) => (*msg).to_string(),
        None => payload
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_else(|| "unknown panic".to_string()),
    }
}

fn spawn_worker(
    sub: Arc<dyn Subscribe>,
    mut rx: mpsc::Receiver<Arc<Event>>,
    events: EventBus,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            let delivery = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await;
            if let Err(panic) = delivery {
                events.publish(Event::subscriber_panicked(sub.name(), panic_info(&*panic)));
            }
        }
    })
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, events: EventBus) -> Self {
        let mut set = Self {
            lanes: Vec::with_capacity(subs.len()),
            workers: Vec::with_capacity(subs.len()),
            events,
        };
        for sub in subs {
            let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
            set.lanes.push(Lane { name: sub.name(), tx });
            set.workers.push(spawn_worker(sub, rx, set.events.clone()));
        }
        set
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// True if the set has no subscriber.
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Queues a copy of `event` for every subscriber.
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Queues an already shared event for every subscriber.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let quiet = event.is_subscriber_overflow();
        let panicked = match event.kind {
            EventKind::SubscriberPanicked => event.name.as_deref(),
            _ => None,
        };
        for lane in &self.lanes {
            if panicked == Some(lane.name) {
                continue;
            }
            let reason = match lane.tx.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "full",
                Err(TrySendError::Closed(_)) => "closed",
            };
            tracing::debug!(subscriber = lane.name, reason, seq = event.seq, "lifecycle event dropped");
            if !quiet {
                self.events.publish(Event::subscriber_overflow(lane.name, reason));
            }
        }
    }

    /// Closes every queue and waits for the workers to drain them.
    pub async fn shutdown(self) {
        drop(self.lanes);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}
