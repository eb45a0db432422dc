//! # Lifecycle event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and built-in
//! implementations for runtime events broadcast through the [`EventBus`](crate::EventBus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   agent task ── publish(Event) ──► EventBus ──► subscriber_listener (Runtime)
//!                                                     │
//!                                                     ├──► AliveTracker::update (inline)
//!                                                     │
//!                                                     └──► SubscriberSet::emit
//!                                                               │
//!                                                     ┌─────────┼─────────┐
//!                                                     ▼         ▼         ▼
//!                                                 LogWriter   Custom     ...
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers**: observe and react to events (logging, alerts)
//! - **Internal state**: [`AliveTracker`], updated inline by the runtime, not queued

mod alive;
#[cfg(feature = "logging")]
mod log;
mod subscribe;
mod subscriber_set;

pub use alive::AliveTracker;
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
pub(crate) use subscriber_set::panic_info;
