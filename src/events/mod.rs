//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to publish/subscribe to
//! runtime events emitted by the runtime, agent tasks and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`EventBus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Runtime` (shutdown events), agent tasks spawned by `Runtime::spawn`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the runtime's subscriber listener (fans out to `SubscriberSet` and updates
//!   `AliveTracker`).

mod bus;
mod event;

pub use bus::EventBus;
pub use event::{Event, EventKind};
