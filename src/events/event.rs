//! # Lifecycle events emitted by the runtime.
//!
//! Agent loops coming and going, the shutdown sequence, and misbehaving subscribers are all
//! reported as an [`Event`] on the [`EventBus`](crate::EventBus). They describe the runtime,
//! not the application: agents talk to each other with [`Message`]s on the
//! [`MessageBus`](crate::MessageBus).
//!
//! Every event takes the next value of a process-wide counter as `seq`. Subscribers run on
//! separate workers, so `seq` is what tells which of two events happened first.
//!
//! ## Example
//! ```rust
//! use switchyard::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::AgentFailed)
//!     .with_name("uploader")
//!     .with_reason("topic=upload error: timeout");
//!
//! assert_eq!(ev.kind, EventKind::AgentFailed);
//! assert_eq!(ev.name.as_deref(), Some("uploader"));
//! ```
//!
//! [`Message`]: crate::Message

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::switch::AgentId;

static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// What happened. The comment on each variant lists the [`Event`] fields it fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The agent's mailbox is subscribed and its loop spawned. `name`, `agent`.
    AgentStarted,
    /// The loop returned an [`ExitReason`](crate::ExitReason). `name`, `agent`, `reason`.
    AgentStopped,
    /// A handler or timer returned an error. `name`, `agent`, `reason`.
    AgentFailed,
    /// The loop panicked and was caught. `name`, `agent`, `reason`.
    AgentPanicked,

    /// OS signal or [`Runtime::request_shutdown`](crate::Runtime::request_shutdown).
    ShutdownRequested,
    /// Every agent task finished before the grace period ran out.
    AllStoppedWithin,
    /// Some agents were still running when the grace period ran out; `reason` names them.
    GraceExceeded,

    /// A subscriber panicked inside `on_event`. `name`, `reason`.
    SubscriberPanicked,
    /// A subscriber queue was full or closed, so it missed an event. `name`, `reason`.
    SubscriberOverflow,
}

impl EventKind {
    /// Short stable label (kebab-case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::SubscriberPanicked => "subscriber-panicked",
            EventKind::SubscriberOverflow => "subscriber-overflow",
            EventKind::ShutdownRequested => "shutdown-requested",
            EventKind::AllStoppedWithin => "all-stopped-within-grace",
            EventKind::GraceExceeded => "grace-exceeded",
            EventKind::AgentStarted => "agent-started",
            EventKind::AgentStopped => "agent-stopped",
            EventKind::AgentFailed => "agent-failed",
            EventKind::AgentPanicked => "agent-panicked",
        }
    }
}

/// One lifecycle event.
#[derive(Clone, Debug)]
pub struct Event {
    /// Position in the process-wide event order.
    pub seq: u64,
    /// When it was created.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Agent (or subscriber) name, if applicable.
    pub name: Option<Arc<str>>,
    /// Agent id, for agent events.
    pub agent: Option<AgentId>,
    /// Human-readable reason (errors, exit reasons, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// New event stamped with the current time and the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            name: None,
            agent: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an agent or subscriber name.
    #[inline]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches an agent identity (id and name).
    #[inline]
    pub fn with_agent(mut self, id: AgentId, name: impl Into<Arc<str>>) -> Self {
        self.agent = Some(id);
        self.with_name(name)
    }

    /// `subscriber` missed an event; `reason` is `"full"` or `"closed"`.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_name(subscriber)
            .with_reason(reason)
    }

    /// `subscriber` panicked with `info`.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_name(subscriber)
            .with_reason(info)
    }

    pub(crate) fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}
