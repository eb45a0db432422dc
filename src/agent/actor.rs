//! # Agent loop: priority draining and dispatch.
//!
//! [`AgentActor`] owns one agent, its mailbox and its dispatch tables. Each cycle:
//!
//! ```text
//!            both queues empty?
//!                 │ yes: wait on high ≤ high_poll
//!                 ▼
//!   ┌──────── drain HIGH to exhaustion ────────┐
//!   │                                          │
//!   └──► LOW burst (≤ burst_limit, stops early │
//!        when low empties or high is pending) ─┘
//! ```
//!
//! Dispatch of one envelope:
//!
//! ```text
//! origin == self ──► drop
//! __quit__       ──► on_shutdown, stop
//! interest=false ──► drop
//! tick           ──► TimerCascade (handled if timers exist)
//! topic          ──► command / query table ──► fallback ──► unhandled
//! first sight    ──► publish __interest__(topic, handled)
//! ```
//!
//! ## Rules
//! - No low-priority message is dispatched while the high queue is non-empty.
//! - `on_shutdown` runs at most once, for quit, `Flow::Shutdown`, cancellation and a closed
//!   mailbox. A handler error ends the loop without it.
//! - `run_cycle` is public so a host event loop can drive the agent step by step.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::context::Context;
use super::dispatch::{Dispatch, Flow};
use super::interest::InterestCache;
use super::Agent;
use crate::config::Config;
use crate::error::{AgentError, ConfigError};
use crate::switch::{AgentId, Envelope, Interest, Mailbox, Message, MessageBus, Recv};
use crate::timer::TimerCascade;

/// Why an agent loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// A `__quit__` message was received.
    Quit,
    /// A handler or timer returned [`Flow::Shutdown`].
    Requested,
    /// The runtime token was cancelled.
    Cancelled,
    /// The mailbox was closed (the agent was unsubscribed).
    Detached,
}

impl ExitReason {
    /// Short stable label for logs and lifecycle events.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Quit => "quit",
            ExitReason::Requested => "requested",
            ExitReason::Cancelled => "cancelled",
            ExitReason::Detached => "detached",
        }
    }
}

/// Outcome of one [`AgentActor::run_cycle`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cycle {
    /// High-priority envelopes taken from the queue.
    pub high: usize,
    /// Low-priority envelopes taken from the queue.
    pub low: usize,
    /// Set when the loop ended during this cycle (or earlier).
    pub stop: Option<ExitReason>,
}

/// Runs one agent.
pub struct AgentActor<A: Agent> {
    agent: A,
    ctx: Context,
    dispatch: Dispatch<A>,
    timers: TimerCascade<A>,
    interest: InterestCache,
    mailbox: Mailbox,
    burst_limit: usize,
    high_poll: Duration,
    exit: Option<ExitReason>,
}

impl<A: Agent> AgentActor<A> {
    /// Validates the agent's timers, allocates its id and subscribes its mailbox to `bus`.
    pub fn new(agent: A, bus: &MessageBus, cfg: &Config) -> Result<Self, ConfigError> {
        let name = agent.name().to_string();
        let timers = TimerCascade::new(&name, agent.timers())?;
        let dispatch = agent.handlers();
        let id = AgentId::next();
        let mailbox = bus.mailbox(id, &name);

        tracing::debug!(agent = %name, %id, timers = timers.len(), "agent subscribed");
        Ok(Self {
            agent,
            ctx: Context::new(id, &name, bus.clone()),
            dispatch,
            timers,
            interest: InterestCache::new(),
            mailbox,
            burst_limit: cfg.burst_limit_clamped(),
            high_poll: cfg.high_poll_clamped(),
            exit: None,
        })
    }

    /// Id stamped on everything this agent publishes.
    pub fn id(&self) -> AgentId {
        self.ctx.id()
    }

    /// Agent name.
    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    /// The agent's context.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// The wrapped agent.
    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// The wrapped agent, mutably.
    pub fn agent_mut(&mut self) -> &mut A {
        &mut self.agent
    }

    /// Interest recorded so far.
    pub fn interest(&self) -> &InterestCache {
        &self.interest
    }

    /// Why the loop ended, if it did.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit
    }

    /// Runs one cycle: optional idle wait, high drain, low burst.
    pub async fn run_cycle(&mut self) -> Result<Cycle, AgentError> {
        let mut cycle = Cycle {
            stop: self.exit,
            ..Cycle::default()
        };
        if cycle.stop.is_some() {
            return Ok(cycle);
        }

        if self.mailbox.high.is_empty() && self.mailbox.low.is_empty() {
            match self.mailbox.high.recv_timeout(self.high_poll).await {
                Recv::Message(env) => {
                    cycle.high += 1;
                    if let Some(reason) = self.deliver(&env)? {
                        cycle.stop = Some(self.finish(reason));
                        return Ok(cycle);
                    }
                }
                Recv::TimedOut => {}
                Recv::Closed => {
                    cycle.stop = Some(self.finish(ExitReason::Detached));
                    return Ok(cycle);
                }
            }
        }

        while let Some(env) = self.mailbox.high.try_recv() {
            cycle.high += 1;
            if let Some(reason) = self.deliver(&env)? {
                cycle.stop = Some(self.finish(reason));
                return Ok(cycle);
            }
        }

        while cycle.low < self.burst_limit && self.mailbox.high.is_empty() {
            let Some(env) = self.mailbox.low.try_recv() else {
                break;
            };
            cycle.low += 1;
            if let Some(reason) = self.deliver(&env)? {
                cycle.stop = Some(self.finish(reason));
                return Ok(cycle);
            }
        }

        Ok(cycle)
    }

    /// Runs cycles until the agent stops or `token` is cancelled.
    pub async fn run(mut self, token: CancellationToken) -> Result<ExitReason, AgentError> {
        tracing::debug!(agent = %self.name(), id = %self.id(), "agent loop started");
        loop {
            let step = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                res = self.run_cycle() => Some(res),
            };
            match step {
                None => return Ok(self.finish(ExitReason::Cancelled)),
                Some(Ok(Cycle { stop: Some(reason), .. })) => return Ok(reason),
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::debug!(
                        agent = %self.name(),
                        label = err.as_label(),
                        "agent loop terminated by handler error"
                    );
                    return Err(err);
                }
            }
        }
    }

    fn deliver(&mut self, env: &Arc<Envelope>) -> Result<Option<ExitReason>, AgentError> {
        if env.origin() == self.ctx.id() {
            return Ok(None);
        }
        let msg = env.message();
        if matches!(msg, Message::Quit) {
            return Ok(Some(ExitReason::Quit));
        }

        let topic = msg.topic();
        let known = self.interest.get(&topic);
        if known == Some(false) {
            tracing::trace!(agent = %self.name(), %topic, "dropped: not interested");
            return Ok(None);
        }

        let mut handled = false;
        let mut flow = Flow::Continue;
        if let Message::Tick(tick) = msg {
            if !self.timers.is_empty() {
                handled = true;
                let (_, timer_flow) = self.timers.fire(&mut self.agent, &self.ctx, tick)?;
                flow = timer_flow;
            }
        }
        if let Some(result) = self.dispatch.invoke(&mut self.agent, &self.ctx, &topic, msg) {
            handled = true;
            if result? == Flow::Shutdown {
                flow = Flow::Shutdown;
            }
        }

        if known.is_none() {
            self.interest.record(topic.clone(), handled);
            self.ctx.publish(Message::Interest(Interest {
                agent: self.ctx.id(),
                topic,
                handled,
            }));
        }

        Ok((flow == Flow::Shutdown).then_some(ExitReason::Requested))
    }

    fn finish(&mut self, reason: ExitReason) -> ExitReason {
        if let Some(prev) = self.exit {
            return prev;
        }
        self.exit = Some(reason);
        self.agent.on_shutdown(&self.ctx);
        self.ctx.bus().unsubscribe(self.ctx.id());
        tracing::debug!(agent = %self.name(), ?reason, "agent loop stopped");
        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::switch::{Payload, Priority, Topic};
    use crate::timer::{Granularity, Tick, TimerSpec};
    use crate::agent::HandlerResult;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<String>,
        echo: Option<(MessageBus, AgentId)>,
        shutdowns: usize,
        timer_hits: Vec<u64>,
    }

    fn on_hi(r: &mut Recorder, _: &Context, _: &Message) -> HandlerResult {
        r.seen.push("hi".into());
        Ok(Flow::Continue)
    }

    fn on_lo(r: &mut Recorder, _: &Context, _: &Message) -> HandlerResult {
        r.seen.push("lo".into());
        if let Some((bus, origin)) = &r.echo {
            bus.publish_with(
                Priority::High,
                Envelope::custom(*origin, Topic::parse("hi").unwrap(), Payload::new()),
            );
        }
        Ok(Flow::Continue)
    }

    fn on_stop(r: &mut Recorder, _: &Context, _: &Message) -> HandlerResult {
        r.seen.push("stop".into());
        Ok(Flow::Shutdown)
    }

    fn on_boom(_: &mut Recorder, _: &Context, _: &Message) -> HandlerResult {
        Err(AgentError::handler("boom", "exploded"))
    }

    fn on_second(r: &mut Recorder, _: &Context, _: Granularity, count: u64) -> HandlerResult {
        r.timer_hits.push(count);
        Ok(Flow::Continue)
    }

    impl Agent for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn handlers(&self) -> Dispatch<Self> {
            Dispatch::new()
                .on("hi", on_hi)
                .on("lo", on_lo)
                .on("stop", on_stop)
                .on("boom", on_boom)
        }

        fn on_shutdown(&mut self, _ctx: &Context) {
            self.shutdowns += 1;
        }
    }

    struct Ticking(Recorder);

    impl Agent for Ticking {
        fn handlers(&self) -> Dispatch<Self> {
            Dispatch::new()
        }

        fn timers(&self) -> Vec<TimerSpec<Self>> {
            fn hit(t: &mut Ticking, ctx: &Context, g: Granularity, c: u64) -> HandlerResult {
                on_second(&mut t.0, ctx, g, c)
            }
            vec![TimerSpec::new("sec", 2, hit)]
        }
    }

    fn cfg() -> Config {
        Config {
            high_poll: Duration::from_millis(10),
            ..Config::default()
        }
    }

    fn send(bus: &MessageBus, origin: AgentId, priority: Priority, topic: &str) {
        bus.publish_with(
            priority,
            Envelope::custom(origin, Topic::parse(topic).unwrap(), Payload::new()),
        );
    }

    #[tokio::test]
    async fn high_messages_precede_low_in_a_cycle() {
        let bus = MessageBus::new();
        let mut actor = AgentActor::new(Recorder::default(), &bus, &cfg()).unwrap();
        let peer = AgentId::next();

        send(&bus, peer, Priority::Low, "lo");
        send(&bus, peer, Priority::Low, "lo");
        send(&bus, peer, Priority::High, "hi");

        let cycle = actor.run_cycle().await.unwrap();
        assert_eq!((cycle.high, cycle.low), (1, 2));
        assert_eq!(actor.agent().seen, vec!["hi", "lo", "lo"]);
    }

    #[tokio::test]
    async fn quit_sent_by_name_takes_the_shutdown_path() {
        let bus = MessageBus::new();
        let mut actor = AgentActor::new(Recorder::default(), &bus, &cfg()).unwrap();
        let peer = Context::new(AgentId::next(), "peer", bus.clone());

        send(&bus, peer.id(), Priority::Low, "lo");
        peer.send("__quit__", Payload::new()).unwrap();
        let err = peer.send("__interest__", Payload::new()).unwrap_err();
        assert_eq!(err.as_label(), "bus_reserved_topic");

        let cycle = actor.run_cycle().await.unwrap();
        assert_eq!((cycle.high, cycle.low), (1, 0));
        assert_eq!(cycle.stop, Some(ExitReason::Quit));
        assert_eq!(actor.agent().shutdowns, 1);
        assert!(actor.agent().seen.is_empty());
    }

    #[tokio::test]
    async fn low_burst_is_bounded() {
        let bus = MessageBus::new();
        let mut actor = AgentActor::new(Recorder::default(), &bus, &cfg()).unwrap();
        let peer = AgentId::next();
        for _ in 0..7 {
            send(&bus, peer, Priority::Low, "lo");
        }

        assert_eq!(actor.run_cycle().await.unwrap().low, 5);
        assert_eq!(actor.run_cycle().await.unwrap().low, 2);
        assert_eq!(actor.agent().seen.len(), 7);
    }

    #[tokio::test]
    async fn burst_yields_to_pending_high_message() {
        let bus = MessageBus::new();
        let peer = AgentId::next();
        let recorder = Recorder {
            echo: Some((bus.clone(), peer)),
            ..Recorder::default()
        };
        let mut actor = AgentActor::new(recorder, &bus, &cfg()).unwrap();
        send(&bus, peer, Priority::Low, "lo");
        send(&bus, peer, Priority::Low, "lo");

        let first = actor.run_cycle().await.unwrap();
        assert_eq!((first.high, first.low), (0, 1));
        let second = actor.run_cycle().await.unwrap();
        assert_eq!((second.high, second.low), (1, 1));
        assert_eq!(actor.agent().seen, vec!["lo", "hi", "lo"]);
    }

    #[tokio::test]
    async fn own_messages_are_never_dispatched() {
        let bus = MessageBus::new();
        let mut actor = AgentActor::new(Recorder::default(), &bus, &cfg()).unwrap();
        let me = actor.id();

        send(&bus, me, Priority::Low, "lo");
        send(&bus, me, Priority::High, "hi");

        let cycle = actor.run_cycle().await.unwrap();
        assert_eq!((cycle.high, cycle.low), (1, 1));
        assert!(actor.agent().seen.is_empty());
    }

    #[tokio::test]
    async fn quit_runs_shutdown_hook_once() {
        let bus = MessageBus::new();
        let mut actor = AgentActor::new(Recorder::default(), &bus, &cfg()).unwrap();
        bus.publish(Envelope::new(AgentId::next(), Message::Quit));
        send(&bus, AgentId::next(), Priority::Low, "lo");

        let cycle = actor.run_cycle().await.unwrap();
        assert_eq!(cycle.stop, Some(ExitReason::Quit));
        assert_eq!(cycle.low, 0);
        assert_eq!(actor.agent().shutdowns, 1);

        let again = actor.run_cycle().await.unwrap();
        assert_eq!(again.stop, Some(ExitReason::Quit));
        assert_eq!(actor.agent().shutdowns, 1);
        assert!(bus.is_empty());
    }

    #[tokio::test]
    async fn handler_can_request_shutdown() {
        let bus = MessageBus::new();
        let actor = AgentActor::new(Recorder::default(), &bus, &cfg()).unwrap();
        send(&bus, AgentId::next(), Priority::Low, "stop");

        let reason = actor.run(CancellationToken::new()).await.unwrap();
        assert_eq!(reason, ExitReason::Requested);
    }

    #[tokio::test]
    async fn handler_error_terminates_loop() {
        let bus = MessageBus::new();
        let actor = AgentActor::new(Recorder::default(), &bus, &cfg()).unwrap();
        send(&bus, AgentId::next(), Priority::Low, "boom");

        let err = actor.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.as_label(), "agent_handler");
    }

    #[tokio::test]
    async fn cancellation_ends_idle_loop() {
        let bus = MessageBus::new();
        let actor = AgentActor::new(Recorder::default(), &bus, &cfg()).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(actor.run(token).await.unwrap(), ExitReason::Cancelled);
    }

    #[tokio::test]
    async fn first_sight_publishes_interest() {
        let bus = MessageBus::new();
        let mut actor = AgentActor::new(Recorder::default(), &bus, &cfg()).unwrap();
        let peer = AgentId::next();
        send(&bus, peer, Priority::Low, "lo");
        send(&bus, peer, Priority::Low, "unknown");

        actor.run_cycle().await.unwrap();
        let me = actor.id();
        assert_eq!(bus.interest(me, &Topic::parse("lo").unwrap()), Some(true));
        assert_eq!(bus.interest(me, &Topic::parse("unknown").unwrap()), Some(false));
        assert_eq!(actor.interest().get(&Topic::parse("unknown").unwrap()), Some(false));
    }

    #[tokio::test]
    async fn ticks_fire_declared_timers() {
        let bus = MessageBus::new();
        let mut actor = AgentActor::new(Ticking(Recorder::default()), &bus, &cfg()).unwrap();
        let clock = AgentId::next();
        for count in 1..=4 {
            let tick = Tick::boundary(Granularity::Second, count);
            bus.publish(Envelope::new(clock, Message::Tick(tick)));
        }

        let cycle = actor.run_cycle().await.unwrap();
        assert_eq!(cycle.high, 4);
        assert_eq!(actor.agent().0.timer_hits, vec![2, 4]);
        assert_eq!(actor.interest().get(&Topic::parse("tick").unwrap()), Some(true));
    }

    #[tokio::test]
    async fn unknown_timer_granularity_fails_construction() {
        struct Broken;
        impl Agent for Broken {
            fn handlers(&self) -> Dispatch<Self> {
                Dispatch::new()
            }
            fn timers(&self) -> Vec<TimerSpec<Self>> {
                fn noop(_: &mut Broken, _: &Context, _: Granularity, _: u64) -> HandlerResult {
                    Ok(Flow::Continue)
                }
                vec![TimerSpec::new("fortnight", 1, noop)]
            }
        }

        let bus = MessageBus::new();
        let err = AgentActor::new(Broken, &bus, &cfg()).err().unwrap();
        assert_eq!(err.as_label(), "config_unknown_granularity");
        assert!(bus.is_empty());
    }
}
