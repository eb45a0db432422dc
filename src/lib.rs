//! # switchyard
//!
//! **Switchyard** is an in-process publish/subscribe runtime for message-driven "agents".
//!
//! Agents are plain structs with a table of handlers. Each one runs its own loop over two
//! queues (high and low priority), learns which topics it cares about, and receives
//! cron-like timer callbacks from a shared heartbeat. A built-in [`LogGovernor`] agent
//! rate-limits log traffic per category across four nested time windows.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Agent impl  │   │  Agent impl  │   │ LogGovernor  │
//!     │  (handlers,  │   │  (handlers)  │   │ (llog, log,  │
//!     │   timers)    │   │              │   │  credits?)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  AgentActor  │   │  AgentActor  │   │  AgentActor  │  one Tokio task each
//!     │ high │ low   │   │ high │ low   │   │ high │ low   │
//!     └──▲───┴──▲────┘   └──▲───┴──▲────┘   └──▲───┴──▲────┘
//!        │      │           │      │           │      │
//! ┌──────┴──────┴───────────┴──────┴───────────┴──────┴───────────────┐
//! │  MessageBus (subscriptions, interest map, fan-out by priority)    │
//! └───────────────────────────────▲───────────────────────────────────┘
//!                                 │ tick (high), every Config::time_base
//!                           ┌─────┴─────┐
//!                           │ Heartbeat │
//!                           └───────────┘
//!
//! Lifecycle (observability):
//!   Runtime ── Event ──► EventBus ──► subscriber_listener ──► AliveTracker
//!                                                       └──► SubscriberSet ──► Subscribe impls
//! ```
//!
//! ### Agent loop
//! ```text
//! loop {
//!   ├─► both queues empty? wait on high ≤ Config::high_poll
//!   ├─► drain high queue to exhaustion
//!   ├─► drain ≤ Config::burst_limit low messages (stop early if a high one arrives)
//!   └─► dispatch each envelope:
//!         self-origin → drop │ __quit__ → on_shutdown, exit │ uninterested → drop
//!         tick → TimerCascade │ topic / topic? → handler │ first sight → __interest__
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                        |
//! |-------------------|-----------------------------------------------------------|-------------------------------------------|
//! | **Messaging**     | Typed messages, topics with query variants, fan-out.      | [`MessageBus`], [`Message`], [`Topic`]    |
//! | **Agents**        | Handler tables, priority loop, interest tracking.         | [`Agent`], [`Dispatch`], [`AgentActor`]   |
//! | **Timers**        | Second/minute/hour/day boundaries and modulo timers.      | [`Heartbeat`], [`TimerSpec`]              |
//! | **Log governor**  | Per-category four-window credit cascade.                  | [`LogGovernor`], [`RateLimits`]           |
//! | **Runtime**       | Spawning, panic isolation, graceful shutdown.             | [`Runtime`], [`Config`]                   |
//! | **Observability** | Lifecycle events and subscribers.                         | [`Subscribe`], [`Event`]                  |
//! | **Errors**        | Typed errors for configuration, handlers and shutdown.    | [`ConfigError`], [`AgentError`], [`RuntimeError`] |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] subscriber rendering lifecycle events with
//!   `tracing` _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use switchyard::{
//!     Agent, Config, Context, Dispatch, Flow, HandlerResult, Level, LogGovernor, Message,
//!     Payload, Runtime,
//! };
//!
//! #[derive(Default)]
//! struct Uploader;
//!
//! fn on_upload(_: &mut Uploader, ctx: &Context, msg: &Message) -> HandlerResult {
//!     let track = msg.payload().and_then(|p| p.str_arg(0)).unwrap_or("?");
//!     ctx.log_limited("npath/upload", Level::Warning, format!("upload of {track} deferred"));
//!     Ok(Flow::Shutdown)
//! }
//!
//! impl Agent for Uploader {
//!     fn handlers(&self) -> Dispatch<Self> {
//!         Dispatch::new().on("upload", on_upload)
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config { grace: Duration::from_secs(1), ..Config::default() };
//!     let rt = Runtime::builder(cfg).build();
//!
//!     rt.spawn(LogGovernor::with_defaults())?;
//!     rt.spawn(Uploader)?;
//!     rt.start_heartbeat();
//!
//!     let env = switchyard::Envelope::custom(
//!         rt.id(),
//!         switchyard::Topic::parse("upload")?,
//!         Payload::new().arg("song.flac"),
//!     );
//!     rt.bus().publish(env);
//!
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!     rt.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod agent;
mod config;
mod core;
mod error;
mod events;
mod governor;
mod subscribers;
mod switch;
mod timer;

// ---- Public re-exports ----

pub use agent::{
    Agent, AgentActor, Context, Cycle, Dispatch, ExitReason, Fallback, Flow, Handler,
    HandlerResult, InterestCache,
};
pub use config::Config;
pub use self::core::{Runtime, RuntimeBuilder, wait_for_shutdown_signal};
pub use error::{AgentError, BusError, ConfigError, RuntimeError};
pub use events::{Event, EventBus, EventKind};
pub use governor::{
    Admission, CREDITS, CreditBucket, CreditLedger, DEFAULT_FALLBACK, FileSink, GovernorStats,
    LogGovernor, LogSink, MemorySink, RateLimits, TracingSink,
};
pub use subscribers::{AliveTracker, Subscribe, SubscriberSet};
pub use switch::{
    AgentId, Envelope, Interest, Level, LogRecord, Mailbox, Message, MessageBus, Payload,
    Priority, QueueDepth, QueueReceiver, QueueSender, Recv, Topic, queue, topic,
};
pub use timer::{Clock, Granularity, Heartbeat, Tick, TimerCascade, TimerFn, TimerSpec};

// Optional: expose a simple built-in lifecycle logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
