//! # MessageBus: fan-out of envelopes to agent queues.
//!
//! [`MessageBus`] is the registry of subscriptions. Each subscription is a pair of queue
//! senders (high and low priority) registered for one agent. `publish` delivers a shared
//! `Arc<Envelope>` to the chosen queue class of **every** current subscriber.
//!
//! ## Architecture
//! ```text
//! Publishers (many threads/tasks):        Subscriptions (RwLock<Vec<..>>):
//!   Agent A ──┐                              ┌──► [high A] [low A] ──► AgentActor A
//!   Agent B ──┼──► publish(env) ─── fan-out ─┼──► [high B] [low B] ──► AgentActor B
//!   Heartbeat ┘                              └──► [high N] [low N] ──► AgentActor N
//! ```
//!
//! ## Rules
//! - **Fire-and-forget**: `publish()` never blocks and returns nothing; queues are unbounded.
//! - **No deduplication**: subscribing an agent twice duplicates its deliveries.
//! - **Interest reports** (`__interest__`) are consumed here and never fanned out. With
//!   `prune_uninterested` set, topics an agent reported as unhandled are no longer delivered
//!   to it; `__quit__` is always delivered.
//! - **Explicit instance**: there is no global bus; clone the handle (cheap, `Arc`-backed).

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::envelope::{AgentId, Envelope, Message, Priority};
use super::queue::{Mailbox, QueueSender, queue};
use super::topic::Topic;

/// One registered delivery target.
#[derive(Debug)]
struct Subscription {
    agent: AgentId,
    name: Arc<str>,
    high: QueueSender,
    low: QueueSender,
}

impl Subscription {
    fn sender(&self, priority: Priority) -> &QueueSender {
        match priority {
            Priority::High => &self.high,
            Priority::Low => &self.low,
        }
    }
}

/// Snapshot of one subscription's queue lengths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueDepth {
    /// Subscribed agent.
    pub agent: AgentId,
    /// Its name.
    pub name: Arc<str>,
    /// Messages waiting in its high-priority queue.
    pub high: usize,
    /// Messages waiting in its low-priority queue.
    pub low: usize,
}

#[derive(Debug, Default)]
struct Inner {
    subscriptions: RwLock<Vec<Subscription>>,
    interest: RwLock<HashMap<(AgentId, Topic), bool>>,
    prune: bool,
}

/// Process-local publish/subscribe switch.
///
/// ### Properties
/// - **Concurrent**: subscribe and publish may be called from any thread or task.
/// - **Non-blocking**: publish only takes a read lock and pushes into unbounded queues.
/// - **Cloneable**: cheap to clone (internally an `Arc`).
#[derive(Clone, Debug, Default)]
pub struct MessageBus {
    inner: Arc<Inner>,
}

impl MessageBus {
    /// Creates an empty bus that always delivers to every subscriber.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty bus; with `prune = true` it honours negative interest reports.
    pub fn with_pruning(prune: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                prune,
                ..Inner::default()
            }),
        }
    }

    /// Registers delivery targets for an agent.
    ///
    /// Not idempotent: a second call for the same agent duplicates delivery.
    pub fn subscribe(&self, agent: AgentId, name: &str, high: QueueSender, low: QueueSender) {
        let mut subs = self
            .inner
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        subs.push(Subscription {
            agent,
            name: Arc::from(name),
            high,
            low,
        });
        tracing::debug!(%agent, name, subscribers = subs.len(), "agent subscribed");
    }

    /// Creates both queues for an agent, subscribes them, and returns the receiving halves.
    pub fn mailbox(&self, agent: AgentId, name: &str) -> Mailbox {
        let (high_tx, high) = queue();
        let (low_tx, low) = queue();
        self.subscribe(agent, name, high_tx, low_tx);
        Mailbox { high, low }
    }

    /// Removes every subscription (and interest report) of an agent.
    pub fn unsubscribe(&self, agent: AgentId) {
        self.inner
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|s| s.agent != agent);
        self.inner
            .interest
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(a, _), _| *a != agent);
        tracing::debug!(%agent, "agent unsubscribed");
    }

    /// Publishes an envelope to the queue class given by its message's default priority.
    pub fn publish(&self, env: Envelope) {
        let priority = env.priority();
        self.publish_with(priority, env);
    }

    /// Publishes an envelope to an explicitly chosen queue class.
    pub fn publish_with(&self, priority: Priority, env: Envelope) {
        if let Message::Interest(report) = env.message() {
            self.record_interest(report.agent, report.topic.clone(), report.handled);
            return;
        }

        let topic = env.topic();
        let env = Arc::new(env);
        let subs = self
            .inner
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let interest = self.inner.prune.then(|| {
            self.inner
                .interest
                .read()
                .unwrap_or_else(PoisonError::into_inner)
        });

        for sub in subs.iter() {
            if let Some(table) = &interest {
                let uninterested = table.get(&(sub.agent, topic.clone())) == Some(&false);
                if uninterested && !matches!(env.message(), Message::Quit) {
                    continue;
                }
            }
            if !sub.sender(priority).send(Arc::clone(&env)) {
                tracing::debug!(agent = %sub.agent, name = %sub.name, %topic, "dropped message: queue closed");
            }
        }
    }

    /// Interest report recorded for `agent` and `topic`, if any.
    pub fn interest(&self, agent: AgentId, topic: &Topic) -> Option<bool> {
        self.inner
            .interest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(agent, topic.clone()))
            .copied()
    }

    /// Current queue lengths of every subscription.
    pub fn depths(&self) -> Vec<QueueDepth> {
        self.inner
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|s| QueueDepth {
                agent: s.agent,
                name: Arc::clone(&s.name),
                high: s.high.depth(),
                low: s.low.depth(),
            })
            .collect()
    }

    /// Number of registered subscriptions.
    pub fn len(&self) -> usize {
        self.inner
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record_interest(&self, agent: AgentId, topic: Topic, handled: bool) {
        tracing::trace!(%agent, %topic, handled, "interest reported");
        self.inner
            .interest
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((agent, topic), handled);
    }
}
