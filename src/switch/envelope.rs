//! # Messages and envelopes.
//!
//! The [`Message`] enum is the tagged union of everything that travels over the
//! [`MessageBus`](crate::MessageBus). Built-in variants carry typed payloads (ticks, log
//! records, interest reports); application traffic uses [`Message::Custom`] with a
//! [`Topic`] and a positional/named [`Payload`].
//!
//! An [`Envelope`] wraps a message with the [`AgentId`] of its origin. Envelopes are immutable
//! and shared as `Arc<Envelope>` between subscriber queues.
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use switchyard::{AgentId, Envelope, Payload, Priority, Topic};
//!
//! let env = Envelope::custom(
//!     AgentId::next(),
//!     Topic::parse("rating").unwrap(),
//!     Payload::new().arg("rhythmbox").arg(4.5).with("track", json!("Intro")),
//! );
//! assert_eq!(env.topic().to_string(), "rating");
//! assert_eq!(env.priority(), Priority::Low);
//! assert_eq!(env.message().payload().and_then(|p| p.str_arg(0)), Some("rhythmbox"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::Serialize;
use serde_json::Value;

use super::topic::{self, Topic};
use crate::timer::Tick;

/// Global counter for agent identifiers.
static AGENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of a message origin (an agent, the heartbeat, the runtime).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AgentId(u64);

impl AgentId {
    /// Allocates a fresh, process-unique identifier.
    pub fn next() -> Self {
        Self(AGENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

/// Queue class a message is delivered to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Drained to exhaustion before anything else (heartbeat, shutdown).
    High,
    /// Drained in bounded bursts (ordinary application traffic).
    Low,
}

/// Log severity carried by log records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    /// Lowercase name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Critical => "critical",
        }
    }

    /// Parses a level leniently: unknown names map to [`Level::Info`].
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(Level::Info)
    }
}

impl FromStr for Level {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" | "i" => Ok(Level::Info),
            "warning" | "warn" | "w" => Ok(Level::Warning),
            "error" | "e" => Ok(Level::Error),
            "critical" | "c" => Ok(Level::Critical),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A log line travelling over the bus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    /// Category-prefixed tag (`"fpath/missing"`); empty for unconstrained writes.
    pub tag: String,
    /// Severity.
    pub level: Level,
    /// Message text.
    pub text: String,
}

impl LogRecord {
    /// Untagged record (for unconstrained `log` writes).
    pub fn new(level: Level, text: impl Into<String>) -> Self {
        Self {
            tag: String::new(),
            level,
            text: text.into(),
        }
    }

    /// Tagged record (for rate-limited `llog` admissions).
    pub fn tagged(tag: impl Into<String>, level: Level, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            level,
            text: text.into(),
        }
    }

    /// Category part of the tag: everything before the first `/`.
    pub fn category(&self) -> &str {
        self.tag.split('/').next().unwrap_or_default()
    }
}

/// Interest report published by an agent the first time it dispatches a topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interest {
    /// Reporting agent.
    pub agent: AgentId,
    /// Topic the report is about.
    pub topic: Topic,
    /// Whether a handler was found for it.
    pub handled: bool,
}

/// Positional and named arguments of an application message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Payload {
    args: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl Payload {
    /// Empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Sets a named argument.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(key.into(), value.into());
        self
    }

    /// Positional arguments.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Named arguments.
    pub fn named(&self) -> &BTreeMap<String, Value> {
        &self.named
    }

    /// Positional argument `i`, if present.
    pub fn get(&self, i: usize) -> Option<&Value> {
        self.args.get(i)
    }

    /// Positional argument `i` as a string.
    pub fn str_arg(&self, i: usize) -> Option<&str> {
        self.args.get(i).and_then(Value::as_str)
    }

    /// Positional argument `i` as an unsigned integer.
    pub fn u64_arg(&self, i: usize) -> Option<u64> {
        self.args.get(i).and_then(Value::as_u64)
    }

    /// Named argument `key`, if present.
    pub fn get_named(&self, key: &str) -> Option<&Value> {
        self.named.get(key)
    }

    /// True if there are neither positional nor named arguments.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.named.is_empty()
    }
}

/// Tagged union of all message kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// Heartbeat tick (`tick`).
    Tick(Tick),
    /// Shutdown request (`__quit__`); handled by the dispatch layer itself.
    Quit,
    /// Interest report (`__interest__`); consumed by the bus.
    Interest(Interest),
    /// Unconstrained log write (`log`).
    Log(LogRecord),
    /// Rate-limited log admission (`llog`).
    LimitedLog(LogRecord),
    /// A rate-limited record reached the sink (`logged`).
    Logged(LogRecord),
    /// Application message with an arbitrary topic.
    Custom {
        /// Routing tag.
        topic: Topic,
        /// Arguments.
        payload: Payload,
    },
}

impl Message {
    /// Topic used for routing and interest tracking.
    pub fn topic(&self) -> Topic {
        match self {
            Message::Tick(_) => Topic::from_static(topic::TICK),
            Message::Quit => Topic::from_static(topic::QUIT),
            Message::Interest(_) => Topic::from_static(topic::INTEREST),
            Message::Log(_) => Topic::from_static(topic::LOG),
            Message::LimitedLog(_) => Topic::from_static(topic::LIMITED_LOG),
            Message::Logged(_) => Topic::from_static(topic::LOGGED),
            Message::Custom { topic, .. } => topic.clone(),
        }
    }

    /// Default queue class: heartbeat and shutdown go high, everything else low.
    pub fn priority(&self) -> Priority {
        match self {
            Message::Tick(_) | Message::Quit => Priority::High,
            _ => Priority::Low,
        }
    }

    /// Payload of a [`Message::Custom`].
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Message::Custom { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Log record of `log`, `llog` and `logged` messages.
    pub fn log_record(&self) -> Option<&LogRecord> {
        match self {
            Message::Log(r) | Message::LimitedLog(r) | Message::Logged(r) => Some(r),
            _ => None,
        }
    }
}

/// Immutable unit of delivery: a message plus its origin.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    origin: AgentId,
    message: Message,
}

impl Envelope {
    /// Wraps a message.
    pub fn new(origin: AgentId, message: Message) -> Self {
        Self { origin, message }
    }

    /// Shorthand for a [`Message::Custom`] envelope.
    pub fn custom(origin: AgentId, topic: Topic, payload: Payload) -> Self {
        Self::new(origin, Message::Custom { topic, payload })
    }

    /// Origin of the message.
    pub fn origin(&self) -> AgentId {
        self.origin
    }

    /// The message itself.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Routing topic.
    pub fn topic(&self) -> Topic {
        self.message.topic()
    }

    /// Default queue class of the message.
    pub fn priority(&self) -> Priority {
        self.message.priority()
    }
}
