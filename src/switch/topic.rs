//! # Message types (topics).
//!
//! A [`Topic`] is the string tag that routes a message to a handler. A trailing `?` marks the
//! **query** variant of a topic, which is routed to a separate handler namespace:
//!
//! ```text
//! "rating"   → command namespace, handler registered with Dispatch::on("rating", ..)
//! "rating?"  → query namespace,   handler registered with Dispatch::on_query("rating", ..)
//! ```
//!
//! ## Rules
//! - The name (without the `?`) is never empty.
//! - `__quit__` and `__interest__` cannot be parsed: they exist only as [`Message::Quit`] and
//!   [`Message::Interest`], so a string-typed publish can never reach the control paths as an
//!   ordinary message.
//! - `foo` and `foo?` are distinct topics (equality and hashing include the query flag).
//!
//! [`Message::Quit`]: crate::Message::Quit
//! [`Message::Interest`]: crate::Message::Interest

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::BusError;

/// Topic of the heartbeat message.
pub const TICK: &str = "tick";
/// Topic of the distinguished shutdown message.
pub const QUIT: &str = "__quit__";
/// Topic used by agents to advertise whether they handle a topic.
pub const INTEREST: &str = "__interest__";
/// Topic of unconstrained log writes.
pub const LOG: &str = "log";
/// Topic of rate-limited log admissions.
pub const LIMITED_LOG: &str = "llog";
/// Topic emitted after a rate-limited record reached the sink.
pub const LOGGED: &str = "logged";

/// Routing tag of a message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic {
    name: Cow<'static, str>,
    query: bool,
}

impl Topic {
    /// Parses a raw message type, splitting off a trailing `?`.
    ///
    /// # Example
    /// ```
    /// use switchyard::Topic;
    ///
    /// let t = Topic::parse("next_to_upload?").unwrap();
    /// assert!(t.is_query());
    /// assert_eq!(t.name(), "next_to_upload");
    /// assert_eq!(t.to_string(), "next_to_upload?");
    /// ```
    pub fn parse(raw: &str) -> Result<Self, BusError> {
        let (name, query) = match raw.strip_suffix('?') {
            Some(name) => (name, true),
            None => (raw, false),
        };
        if name.is_empty() {
            return Err(BusError::EmptyTopic);
        }
        if name == QUIT || name == INTEREST {
            return Err(BusError::ReservedTopic {
                topic: raw.to_string(),
            });
        }
        Ok(Self {
            name: Cow::Owned(name.to_string()),
            query,
        })
    }

    /// Command topic with a static name (used for the built-in topics).
    pub(crate) const fn from_static(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            query: false,
        }
    }

    /// Name without the query marker.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True for `foo?` topics.
    pub fn is_query(&self) -> bool {
        self.query
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.query {
            write!(f, "{}?", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

impl FromStr for Topic {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_and_query_are_distinct() {
        let cmd = Topic::parse("rating").unwrap();
        let query = Topic::parse("rating?").unwrap();
        assert_eq!(cmd.name(), query.name());
        assert_ne!(cmd, query);
        assert!(!cmd.is_query());
        assert!(query.is_query());
    }

    #[test]
    fn empty_names_are_rejected() {
        assert_eq!(Topic::parse(""), Err(BusError::EmptyTopic));
        assert_eq!(Topic::parse("?"), Err(BusError::EmptyTopic));
    }

    #[test]
    fn control_topics_cannot_be_parsed() {
        for raw in ["__quit__", "__quit__?", "__interest__"] {
            assert_eq!(
                Topic::parse(raw),
                Err(BusError::ReservedTopic {
                    topic: raw.to_string()
                })
            );
        }
        assert!(Topic::parse("quit").is_ok());
    }

    #[test]
    fn only_one_trailing_marker_is_stripped() {
        let t: Topic = "odd??".parse().unwrap();
        assert_eq!(t.name(), "odd?");
        assert!(t.is_query());
    }

    #[test]
    fn static_topic_equals_parsed_one() {
        assert_eq!(Topic::from_static(TICK), Topic::parse("tick").unwrap());
    }
}
