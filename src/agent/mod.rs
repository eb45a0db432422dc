//! # Agents: message handlers with their own loop.
//!
//! An agent is a plain struct implementing [`Agent`]. It never touches queues directly:
//!
//! ```text
//!  Agent::handlers() ──► Dispatch<A>      (topic → fn pointer)
//!  Agent::timers()   ──► TimerCascade<A>  (validated at construction)
//!            │
//!            ▼
//!      AgentActor<A> ◄── Mailbox (high, low) ◄── MessageBus
//!            │
//!            └── Context (id, name, bus) passed to every handler
//! ```
//!
//! ## Example
//! ```rust
//! use switchyard::{Agent, Context, Dispatch, Flow, HandlerResult, Level, Message};
//!
//! #[derive(Default)]
//! struct Ratings { pending: Vec<String> }
//!
//! fn on_rating(r: &mut Ratings, ctx: &Context, msg: &Message) -> HandlerResult {
//!     if let Some(track) = msg.payload().and_then(|p| p.str_arg(0)) {
//!         r.pending.push(track.to_string());
//!         ctx.log(Level::Info, format!("queued {track}"));
//!     }
//!     Ok(Flow::Continue)
//! }
//!
//! impl Agent for Ratings {
//!     fn name(&self) -> &str { "ratings" }
//!     fn handlers(&self) -> Dispatch<Self> {
//!         Dispatch::new().on("rating", on_rating)
//!     }
//! }
//! ```

mod actor;
mod context;
mod dispatch;
mod interest;

pub use actor::{AgentActor, Cycle, ExitReason};
pub use context::Context;
pub use dispatch::{Dispatch, Fallback, Flow, Handler, HandlerResult};
pub use interest::InterestCache;

use crate::timer::TimerSpec;

/// A message-driven component run by an [`AgentActor`].
pub trait Agent: Send + Sized + 'static {
    /// Name used in logs, lifecycle events and configuration errors.
    ///
    /// Defaults to the type name without its module path.
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Handler table; built once when the agent is started.
    fn handlers(&self) -> Dispatch<Self>;

    /// Timer declarations, in firing order within each granularity.
    fn timers(&self) -> Vec<TimerSpec<Self>> {
        Vec::new()
    }

    /// Called once when the loop stops normally (quit, requested shutdown, cancellation).
    fn on_shutdown(&mut self, _ctx: &Context) {}
}
