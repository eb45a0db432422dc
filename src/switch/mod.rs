//! Message switch: envelopes, topics, delivery queues and the bus.
//!
//! This module groups the **data model** of inter-agent messages and the **bus** used to
//! deliver them.
//!
//! ## Contents
//! - [`Topic`] routing tag, with the `?` query marker
//! - [`Message`], [`Envelope`], [`Payload`] the tagged union and its wrapper
//! - [`QueueSender`], [`QueueReceiver`], [`Mailbox`] unbounded queues with a depth gauge
//! - [`MessageBus`] subscription registry and fan-out

mod bus;
mod envelope;
mod queue;
pub mod topic;

pub use bus::{MessageBus, QueueDepth};
pub use envelope::{AgentId, Envelope, Interest, Level, LogRecord, Message, Payload, Priority};
pub use queue::{Mailbox, QueueReceiver, QueueSender, Recv, queue};
pub use topic::Topic;
