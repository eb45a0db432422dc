//! # Dispatch table: topic → handler.
//!
//! A [`Dispatch`] maps topic names to plain function pointers, in two separate namespaces:
//!
//! ```text
//! "rating"           ──► commands["rating"]   (Dispatch::on)
//! "next_to_upload?"  ──► queries["next_to_upload"] (Dispatch::on_query)
//! anything else      ──► fallback(topic, message)  (Dispatch::fallback, optional)
//! ```
//!
//! Handlers are `fn` pointers, so every registration is type-checked against the agent type
//! at compile time, and the table is `Send` without boxing.
//!
//! ## Example
//! ```rust
//! use switchyard::{Context, Dispatch, Flow, HandlerResult, Message};
//!
//! #[derive(Default)]
//! struct Counter { seen: u64 }
//!
//! fn on_bump(c: &mut Counter, _ctx: &Context, _msg: &Message) -> HandlerResult {
//!     c.seen += 1;
//!     Ok(Flow::Continue)
//! }
//!
//! let table: Dispatch<Counter> = Dispatch::new().on("bump", on_bump);
//! assert!(table.handles("bump", false));
//! assert!(!table.handles("bump", true));
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use super::context::Context;
use crate::error::AgentError;
use crate::switch::{Message, Topic};

/// What the loop should do after a handler returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Keep processing messages.
    Continue,
    /// Run the shutdown hook and leave the loop.
    Shutdown,
}

/// Result of a handler or timer callback.
pub type HandlerResult = Result<Flow, AgentError>;

/// Command or query handler.
pub type Handler<A> = fn(&mut A, &Context, &Message) -> HandlerResult;

/// Handler for topics without a dedicated entry.
pub type Fallback<A> = fn(&mut A, &Context, &Topic, &Message) -> HandlerResult;

/// Per-agent routing table.
pub struct Dispatch<A> {
    commands: HashMap<Cow<'static, str>, Handler<A>>,
    queries: HashMap<Cow<'static, str>, Handler<A>>,
    fallback: Option<Fallback<A>>,
}

impl<A> Default for Dispatch<A> {
    fn default() -> Self {
        Self {
            commands: HashMap::new(),
            queries: HashMap::new(),
            fallback: None,
        }
    }
}

impl<A> fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("queries", &self.queries.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl<A> Dispatch<A> {
    /// Empty table: every topic is unhandled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler of command topic `name`.
    pub fn on(mut self, name: impl Into<Cow<'static, str>>, handler: Handler<A>) -> Self {
        self.commands.insert(name.into(), handler);
        self
    }

    /// Registers the handler of query topic `name?` (pass the name without `?`).
    pub fn on_query(mut self, name: impl Into<Cow<'static, str>>, handler: Handler<A>) -> Self {
        self.queries.insert(name.into(), handler);
        self
    }

    /// Registers the handler for topics without a dedicated entry.
    pub fn fallback(mut self, handler: Fallback<A>) -> Self {
        self.fallback = Some(handler);
        self
    }

    /// True if a dedicated handler exists for `name` in the given namespace.
    pub fn handles(&self, name: &str, query: bool) -> bool {
        self.namespace(query).contains_key(name)
    }

    /// Invokes the handler for `msg`; `None` if neither a dedicated nor a fallback handler
    /// exists.
    pub(crate) fn invoke(
        &self,
        agent: &mut A,
        ctx: &Context,
        topic: &Topic,
        msg: &Message,
    ) -> Option<HandlerResult> {
        if let Some(handler) = self.namespace(topic.is_query()).get(topic.name()) {
            return Some(handler(agent, ctx, msg));
        }
        self.fallback.map(|fallback| fallback(agent, ctx, topic, msg))
    }

    fn namespace(&self, query: bool) -> &HashMap<Cow<'static, str>, Handler<A>> {
        if query { &self.queries } else { &self.commands }
    }
}
