use std::sync::Arc;

use super::runtime::Runtime;
use crate::{
    config::Config,
    events::EventBus,
    subscribers::{AliveTracker, Subscribe, SubscriberSet},
    switch::MessageBus,
};

/// Builder for constructing a [`Runtime`].
pub struct RuntimeBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl RuntimeBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets lifecycle event subscribers.
    ///
    /// Subscribers receive runtime events (agent started/stopped/failed, shutdown) through
    /// dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one lifecycle event subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the runtime.
    ///
    /// Must be called from within a Tokio runtime: subscriber workers and the event listener
    /// are spawned here.
    pub fn build(self) -> Arc<Runtime> {
        let bus = MessageBus::with_pruning(self.cfg.prune_uninterested);
        let events = EventBus::new(self.cfg.event_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, events.clone()));
        let alive = Arc::new(AliveTracker::new());

        let rt = Arc::new(Runtime::new_internal(self.cfg, bus, events, subs, alive));
        rt.subscriber_listener();
        rt
    }
}
