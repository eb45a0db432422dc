//! Error types used by the switchyard runtime, its agents and their configuration.
//!
//! This module defines four error enums:
//!
//! - [`ConfigError`]: rejected configuration, raised while an agent or the log governor is built.
//! - [`BusError`]: malformed messages refused by the [`MessageBus`](crate::MessageBus).
//! - [`AgentError`]: errors returned by handlers; they terminate the offending agent loop.
//! - [`RuntimeError`]: errors raised by the orchestration runtime itself.
//!
//! All of them provide `as_label` (stable snake_case label for logs) and `as_message`.

use std::time::Duration;
use thiserror::Error;

/// # Configuration errors.
///
/// Raised at construction time so that a misconfigured agent fails fast instead of at its first
/// timer firing or its first log admission.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Timer declared with a granularity other than `sec`, `min`, `hour` or `day`.
    #[error("agent '{agent}': unknown timer granularity '{granularity}'")]
    UnknownGranularity {
        /// Agent that declared the timer.
        agent: String,
        /// The granularity as written in the declaration.
        granularity: String,
    },

    /// Timer declared with a zero interval.
    #[error("agent '{agent}': timer on '{granularity}' has a zero interval")]
    ZeroInterval {
        /// Agent that declared the timer.
        agent: String,
        /// Granularity of the offending timer.
        granularity: String,
    },

    /// Rate-limit table has no entry for the fallback category.
    #[error("rate limits have no entry for fallback category '{category}'")]
    MissingFallback {
        /// Name of the missing fallback category.
        category: String,
    },

    /// Rate-limit table could not be parsed.
    #[error("invalid rate-limit configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration file could not be read (or a log file could not be opened).
    #[error("configuration i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::UnknownGranularity { .. } => "config_unknown_granularity",
            ConfigError::ZeroInterval { .. } => "config_zero_interval",
            ConfigError::MissingFallback { .. } => "config_missing_fallback",
            ConfigError::Parse(_) => "config_parse",
            ConfigError::Io(_) => "config_io",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

/// # Errors produced by the message bus.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// A message type must have a non-empty name (a lone `?` is empty too).
    #[error("message type is empty")]
    EmptyTopic,

    /// Control topics (`__quit__`, `__interest__`) only travel as typed messages.
    #[error("message type '{topic}' is reserved")]
    ReservedTopic {
        /// The rejected name.
        topic: String,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use switchyard::BusError;
    ///
    /// assert_eq!(BusError::EmptyTopic.as_label(), "bus_empty_topic");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::EmptyTopic => "bus_empty_topic",
            BusError::ReservedTopic { .. } => "bus_reserved_topic",
        }
    }
}

/// # Errors produced by agent handlers.
///
/// The dispatch layer does not recover from these: a handler returning `Err` terminates its
/// agent's loop, and the runtime reports it as `AgentFailed`. Agents are expected to guard
/// known-fallible work (collaborator I/O) themselves.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AgentError {
    /// A handler failed while processing a message.
    #[error("handler for '{topic}' failed: {error}")]
    Handler {
        /// Topic of the message being handled.
        topic: String,
        /// The underlying error message.
        error: String,
    },

    /// The message payload did not have the shape the handler expects.
    #[error("bad payload for '{topic}': {reason}")]
    Payload {
        /// Topic of the message being handled.
        topic: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Non-recoverable error raised by the agent itself.
    #[error("fatal agent error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },
}

impl AgentError {
    /// Builds a [`AgentError::Handler`].
    pub fn handler(topic: impl Into<String>, error: impl ToString) -> Self {
        AgentError::Handler {
            topic: topic.into(),
            error: error.to_string(),
        }
    }

    /// Builds a [`AgentError::Payload`].
    pub fn payload(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        AgentError::Payload {
            topic: topic.into(),
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use switchyard::AgentError;
    ///
    /// let err = AgentError::payload("rating", "missing track name");
    /// assert_eq!(err.as_label(), "agent_payload");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            AgentError::Handler { .. } => "agent_handler",
            AgentError::Payload { .. } => "agent_payload",
            AgentError::Fatal { .. } => "agent_fatal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            AgentError::Handler { topic, error } => format!("topic={topic} error: {error}"),
            AgentError::Payload { topic, reason } => format!("topic={topic} payload: {reason}"),
            AgentError::Fatal { error } => format!("fatal: {error}"),
        }
    }
}

/// # Errors produced by the switchyard runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some agents remained stuck and had to be aborted.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the agents that did not stop in time.
        stuck: Vec<String>,
    },

    /// An agent could not be started because its configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use switchyard::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Config(e) => e.as_label(),
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck agents={stuck:?}")
            }
            RuntimeError::Config(e) => e.as_message(),
        }
    }
}
