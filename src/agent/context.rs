//! Handler-side view of the runtime: identity plus a publishing handle.

use std::sync::Arc;

use crate::error::BusError;
use crate::switch::{
    AgentId, Envelope, Level, LogRecord, Message, MessageBus, Payload, Priority, Topic,
    topic::QUIT,
};

/// Passed to every handler, timer callback and shutdown hook.
///
/// Everything published through a context carries the agent's id as origin, so the agent will
/// never see its own messages.
#[derive(Clone, Debug)]
pub struct Context {
    id: AgentId,
    name: Arc<str>,
    bus: MessageBus,
}

impl Context {
    pub(crate) fn new(id: AgentId, name: &str, bus: MessageBus) -> Self {
        Self {
            id,
            name: Arc::from(name),
            bus,
        }
    }

    /// Id of the agent owning this context.
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Name of the agent owning this context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bus the agent is subscribed to.
    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Publishes a message on its default queue class.
    pub fn publish(&self, message: Message) {
        self.bus.publish(Envelope::new(self.id, message));
    }

    /// Publishes a message on an explicit queue class.
    pub fn publish_with(&self, priority: Priority, message: Message) {
        self.bus.publish_with(priority, Envelope::new(self.id, message));
    }

    /// Publishes an application message; `topic` may end with `?` to address a query.
    ///
    /// `"__quit__"` publishes [`Message::Quit`] on the high path and ignores `payload`. Other
    /// control topics are rejected with [`BusError::ReservedTopic`].
    pub fn send(&self, topic: &str, payload: Payload) -> Result<(), BusError> {
        if topic == QUIT {
            self.publish(Message::Quit);
            return Ok(());
        }
        let topic = Topic::parse(topic)?;
        self.publish(Message::Custom { topic, payload });
        Ok(())
    }

    /// Unconstrained log write.
    pub fn log(&self, level: Level, text: impl Into<String>) {
        self.publish(Message::Log(LogRecord::new(level, text)));
    }

    /// Rate-limited log admission; `tag` is `"<category>/<detail>"`.
    pub fn log_limited(&self, tag: impl Into<String>, level: Level, text: impl Into<String>) {
        self.publish(Message::LimitedLog(LogRecord::tagged(tag, level, text)));
    }
}
