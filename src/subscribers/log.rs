//! # LogWriter: lifecycle events rendered through `tracing`.
//!
//! A minimal subscriber that turns incoming [`Event`]s into `tracing` events under the
//! `switchyard::lifecycle` target. Useful for demos and debugging.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  switchyard::lifecycle: [agent-started] agent="log-governor" id=agent-3
//! WARN  switchyard::lifecycle: [agent-failed] agent="uploader" err="topic=upload error: timeout"
//! INFO  switchyard::lifecycle: [shutdown-requested]
//! INFO  switchyard::lifecycle: [all-stopped-within-grace]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Lifecycle event writer.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let label = e.kind.as_label();
        let name = e.name.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::AgentStarted => {
                let id = e.agent.map(|id| id.to_string()).unwrap_or_default();
                tracing::info!(target: "switchyard::lifecycle", "[{label}] agent={name:?} id={id}");
            }
            EventKind::AgentStopped => {
                tracing::info!(target: "switchyard::lifecycle", "[{label}] agent={name:?} reason={reason}");
            }
            EventKind::AgentFailed | EventKind::AgentPanicked => {
                tracing::warn!(target: "switchyard::lifecycle", "[{label}] agent={name:?} err={reason:?}");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                tracing::warn!(target: "switchyard::lifecycle", "[{label}] subscriber={name} info={reason}");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(target: "switchyard::lifecycle", "[{label}] stuck={reason}");
            }
            EventKind::ShutdownRequested | EventKind::AllStoppedWithin => {
                tracing::info!(target: "switchyard::lifecycle", "[{label}]");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
