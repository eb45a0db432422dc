//! # Runtime: spawns agent loops, fans out lifecycle events, performs graceful shutdown.
//!
//! The [`Runtime`] owns the [`MessageBus`], the lifecycle [`EventBus`], a [`SubscriberSet`]
//! and the global [`Config`]. It spawns one Tokio task per agent, drives the heartbeat, handles
//! OS signals, and stops every agent by broadcasting `__quit__`.
//!
//! ## High-level architecture
//! ```text
//! Runtime::spawn(agent)
//!   └──► AgentActor::new(agent, bus, cfg)        (timers validated, mailbox subscribed)
//!        └──► publish AgentStarted
//!             tracker.spawn(catch_unwind(actor.run(child_token)))
//!                   └─► Ok(reason)  → AgentStopped
//!                   └─► Err(error)  → AgentFailed
//!                   └─► panic       → AgentPanicked
//!
//! Runtime::start_heartbeat()
//!   └──► Heartbeat ── tick (high) ──► MessageBus ──► every agent's TimerCascade
//!
//! Event flow:
//!   agent task ── publish(Event) ──► EventBus ──► subscriber_listener ──► AliveTracker
//!                                                                   └──► SubscriberSet::emit
//!
//! Shutdown path (OS signal or request_shutdown()):
//!   EventBus.publish(ShutdownRequested)
//!   MessageBus.publish(__quit__)  (high path, every agent)
//!   wait up to cfg.grace for every agent task:
//!      ├─ Ok       → AllStoppedWithin
//!      └─ timeout  → GraceExceeded, cancel token, abort tasks,
//!                    RuntimeError::GraceExceeded { stuck = AliveTracker::snapshot() }
//!   stop the listener after it forwarded what is buffered, then drain every subscriber
//!   queue (bounded by cfg.grace)
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use switchyard::{Config, LogGovernor, Runtime};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config { grace: Duration::from_secs(1), ..Config::default() };
//!     let rt = Runtime::builder(cfg).build();
//!
//!     rt.spawn(LogGovernor::with_defaults())?;
//!     rt.start_heartbeat();
//!
//!     let stopper = rt.clone();
//!     tokio::spawn(async move {
//!         tokio::time::sleep(Duration::from_millis(50)).await;
//!         stopper.request_shutdown();
//!     });
//!     rt.run().await?;
//!     Ok(())
//! }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::builder::RuntimeBuilder;
use super::shutdown;
use crate::agent::{Agent, AgentActor};
use crate::config::Config;
use crate::error::RuntimeError;
use crate::events::{Event, EventBus, EventKind};
use crate::subscribers::{AliveTracker, SubscriberSet, panic_info};
use crate::switch::{AgentId, Envelope, Message, MessageBus};
use crate::timer::Heartbeat;

/// Coordinates agent tasks, lifecycle event delivery and graceful shutdown.
pub struct Runtime {
    cfg: Config,
    id: AgentId,
    bus: MessageBus,
    events: EventBus,
    subs: Mutex<Option<Arc<SubscriberSet>>>,
    alive: Arc<AliveTracker>,
    token: CancellationToken,
    stop: CancellationToken,
    listener_stop: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
    tracker: TaskTracker,
    handles: Mutex<Vec<AbortHandle>>,
}

impl Runtime {
    /// Starts building a runtime with the given configuration.
    pub fn builder(cfg: Config) -> RuntimeBuilder {
        RuntimeBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        cfg: Config,
        bus: MessageBus,
        events: EventBus,
        subs: Arc<SubscriberSet>,
        alive: Arc<AliveTracker>,
    ) -> Self {
        Self {
            cfg,
            id: AgentId::next(),
            bus,
            events,
            subs: Mutex::new(Some(subs)),
            alive,
            token: CancellationToken::new(),
            stop: CancellationToken::new(),
            listener_stop: CancellationToken::new(),
            listener: Mutex::new(None),
            tracker: TaskTracker::new(),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// The application message bus shared by every agent.
    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// The lifecycle event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Liveness view fed by lifecycle events.
    pub fn alive(&self) -> &AliveTracker {
        &self.alive
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Origin id of messages published by the runtime itself (the quit broadcast).
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Constructs an agent loop and spawns it.
    ///
    /// Fails with [`RuntimeError::Config`] if the agent's timer declarations are invalid; in
    /// that case nothing is subscribed.
    pub fn spawn<A: Agent>(&self, agent: A) -> Result<AgentId, RuntimeError> {
        let actor = AgentActor::new(agent, &self.bus, &self.cfg)?;
        let id = actor.id();
        let name: Arc<str> = Arc::from(actor.name());

        self.events
            .publish(Event::new(EventKind::AgentStarted).with_agent(id, Arc::clone(&name)));

        let events = self.events.clone();
        let bus = self.bus.clone();
        let child = self.token.child_token();
        let handle = self.tracker.spawn(async move {
            let outcome = AssertUnwindSafe(actor.run(child)).catch_unwind().await;
            bus.unsubscribe(id);
            let ev = match outcome {
                Ok(Ok(reason)) => Event::new(EventKind::AgentStopped).with_reason(reason.as_str()),
                Ok(Err(err)) => {
                    tracing::warn!(agent = %name, label = err.as_label(), "agent failed: {}", err.as_message());
                    Event::new(EventKind::AgentFailed).with_reason(err.as_message())
                }
                Err(panic) => {
                    let info = panic_info(&*panic);
                    tracing::error!(agent = %name, "agent panicked: {info}");
                    Event::new(EventKind::AgentPanicked).with_reason(info)
                }
            };
            events.publish(ev.with_agent(id, name));
        });
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle.abort_handle());
        Ok(id)
    }

    /// Spawns the heartbeat publishing ticks every `cfg.time_base`; returns its origin id.
    ///
    /// The heartbeat stops when the runtime finishes.
    pub fn start_heartbeat(&self) -> AgentId {
        let heartbeat = Heartbeat::new(self.bus.clone(), self.cfg.time_base_clamped());
        let id = heartbeat.id();
        tokio::spawn(heartbeat.run(self.token.child_token()));
        id
    }

    /// Asks a running [`Runtime::run`] to perform a graceful shutdown.
    pub fn request_shutdown(&self) {
        self.stop.cancel();
    }

    /// Runs until either:
    /// - every agent exits on its own, or
    /// - an OS termination signal arrives or [`Runtime::request_shutdown`] is called, followed
    ///   by a graceful shutdown (may end with `GraceExceeded`).
    pub async fn run(&self) -> Result<(), RuntimeError> {
        self.tracker.close();
        tokio::select! {
            signal = shutdown::shutdown_signal_or_pending() => {
                tracing::info!(signal, "shutdown signal received");
                self.shutdown().await
            }
            _ = self.stop.cancelled() => self.shutdown().await,
            _ = self.tracker.wait() => {
                self.token.cancel();
                self.drain_subscribers().await;
                Ok(())
            }
        }
    }

    /// Broadcasts `__quit__` and waits up to `cfg.grace` for every agent to stop.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.events.publish(Event::new(EventKind::ShutdownRequested));
        self.bus.publish(Envelope::new(self.id, Message::Quit));
        self.tracker.close();

        let grace = self.cfg.grace;
        let within = tokio::time::timeout(grace, self.tracker.wait()).await;
        self.token.cancel();

        let res = match within {
            Ok(()) => {
                self.events.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                let stuck = self.alive.snapshot().await;
                self.events
                    .publish(Event::new(EventKind::GraceExceeded).with_reason(stuck.join(", ")));
                for handle in self
                    .handles
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .drain(..)
                {
                    handle.abort();
                }
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        };
        self.drain_subscribers().await;
        res
    }

    /// Stops the listener once it forwarded every buffered event, then waits (at most
    /// `cfg.grace`) for the subscriber workers to empty their queues. Later calls do nothing.
    async fn drain_subscribers(&self) {
        let Some(set) = self.subs.lock().unwrap_or_else(PoisonError::into_inner).take() else {
            return;
        };
        self.listener_stop.cancel();
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            if let Err(err) = listener.await {
                tracing::warn!(error = %err, "lifecycle listener ended abnormally");
            }
        }

        match Arc::try_unwrap(set) {
            Ok(set) => {
                if tokio::time::timeout(self.cfg.grace, set.shutdown()).await.is_err() {
                    tracing::warn!(grace = ?self.cfg.grace, "subscribers did not drain in time");
                }
            }
            Err(_) => tracing::debug!("subscriber set still shared; skipping drain"),
        }
    }

    /// Subscribes to the event bus and forwards events to the alive tracker and the
    /// subscriber set until [`Runtime::shutdown`] stops it.
    pub(super) fn subscriber_listener(&self) {
        let Some(set) = self
            .subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        else {
            return;
        };
        let mut rx = self.events.subscribe();
        let alive = Arc::clone(&self.alive);
        let stop = self.listener_stop.clone();
        let handle = tokio::spawn(async move {
            loop {
                let ev = tokio::select! {
                    biased;
                    res = rx.recv() => res,
                    _ = stop.cancelled() => break,
                };
                match ev {
                    Ok(ev) => {
                        alive.update(&ev).await;
                        set.emit(&ev);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "lifecycle listener lagged");
                    }
                    Err(RecvError::Closed) => return,
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => {
                        alive.update(&ev).await;
                        set.emit(&ev);
                    }
                    Err(TryRecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "lifecycle listener lagged");
                    }
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }
        });
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }
}
