//! # Cron-like timers fired from heartbeat ticks.
//!
//! An agent declares an ordered list of [`TimerSpec`]s; on each [`Tick`] the cascade fires,
//! for every granularity whose boundary flag is set, each timer of that granularity whose
//! interval divides the current count:
//!
//! ```text
//! tick ──► [sec?] ──► timers(sec)  where count(sec)  % interval == 0
//!      ──► [min?] ──► timers(min)  where count(min)  % interval == 0
//!      ──► [hour?]──► timers(hour) where count(hour) % interval == 0
//!      ──► [day?] ──► timers(day)  where count(day)  % interval == 0
//! ```
//!
//! ## Rules
//! - Each granularity is driven only by its own flag and fires at most once per tick.
//! - Declaration order is preserved within a granularity.
//! - A callback returning `Err` stops the cascade and the error propagates to the agent loop.
//! - Unknown granularity names and zero intervals are rejected by [`TimerCascade::new`].

use std::borrow::Cow;
use std::fmt;

use super::tick::{Granularity, Tick};
use crate::agent::{Context, Flow, HandlerResult};
use crate::error::{AgentError, ConfigError};

/// Timer callback: `(agent, ctx, granularity, count)`.
pub type TimerFn<A> = fn(&mut A, &Context, Granularity, u64) -> HandlerResult;

/// One timer declaration: `(granularity, interval, callback)`.
pub struct TimerSpec<A> {
    granularity: Cow<'static, str>,
    interval: u32,
    callback: TimerFn<A>,
}

impl<A> TimerSpec<A> {
    /// Declares a timer by granularity name (`"sec"`, `"min"`, `"hour"`, `"day"`).
    ///
    /// The name is validated when the agent is constructed.
    pub fn new(
        granularity: impl Into<Cow<'static, str>>,
        interval: u32,
        callback: TimerFn<A>,
    ) -> Self {
        Self {
            granularity: granularity.into(),
            interval,
            callback,
        }
    }

    /// Declares a timer with a typed granularity.
    pub fn every(granularity: Granularity, interval: u32, callback: TimerFn<A>) -> Self {
        Self::new(granularity.as_str(), interval, callback)
    }
}

impl<A> fmt::Debug for TimerSpec<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerSpec")
            .field("granularity", &self.granularity)
            .field("interval", &self.interval)
            .finish()
    }
}

struct Timer<A> {
    interval: u64,
    callback: TimerFn<A>,
}

/// Validated timers of one agent, grouped by granularity.
pub struct TimerCascade<A> {
    slots: [Vec<Timer<A>>; 4],
}

impl<A> TimerCascade<A> {
    /// Validates and groups `specs`.
    pub fn new(agent: &str, specs: Vec<TimerSpec<A>>) -> Result<Self, ConfigError> {
        let mut slots: [Vec<Timer<A>>; 4] = Default::default();
        for spec in specs {
            let g: Granularity =
                spec.granularity
                    .parse()
                    .map_err(|()| ConfigError::UnknownGranularity {
                        agent: agent.to_string(),
                        granularity: spec.granularity.to_string(),
                    })?;
            if spec.interval == 0 {
                return Err(ConfigError::ZeroInterval {
                    agent: agent.to_string(),
                    granularity: g.as_str().to_string(),
                });
            }
            slots[g.index()].push(Timer {
                interval: u64::from(spec.interval),
                callback: spec.callback,
            });
        }
        Ok(Self { slots })
    }

    /// True if no timer is declared.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Vec::is_empty)
    }

    /// Number of declared timers.
    pub fn len(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }

    /// Fires the timers due on `tick`.
    ///
    /// Returns how many callbacks ran and the combined flow (`Shutdown` if any callback asked
    /// for it; remaining timers of the same tick still run).
    pub fn fire(&self, agent: &mut A, ctx: &Context, tick: &Tick) -> Result<(usize, Flow), AgentError> {
        let mut fired = 0;
        let mut flow = Flow::Continue;
        for g in Granularity::ALL {
            if !tick.is_boundary(g) {
                continue;
            }
            let count = tick.count(g);
            for timer in &self.slots[g.index()] {
                if count % timer.interval != 0 {
                    continue;
                }
                fired += 1;
                if (timer.callback)(agent, ctx, g, count)? == Flow::Shutdown {
                    flow = Flow::Shutdown;
                }
            }
        }
        Ok((fired, flow))
    }
}

impl<A> fmt::Debug for TimerCascade<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per: Vec<(Granularity, usize)> = Granularity::ALL
            .iter()
            .map(|g| (*g, self.slots[g.index()].len()))
            .collect();
        f.debug_struct("TimerCascade").field("timers", &per).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::switch::{AgentId, MessageBus};

    #[derive(Default)]
    struct Recorder {
        fired: Vec<(Granularity, u64)>,
    }

    fn record(r: &mut Recorder, _: &Context, g: Granularity, count: u64) -> HandlerResult {
        r.fired.push((g, count));
        Ok(Flow::Continue)
    }

    fn fail(_: &mut Recorder, _: &Context, g: Granularity, _: u64) -> HandlerResult {
        Err(AgentError::handler("timer", format!("{g} failed")))
    }

    fn ctx() -> Context {
        Context::new(AgentId::next(), "recorder", MessageBus::new())
    }

    #[test]
    fn fires_when_interval_divides_count() {
        let cascade = TimerCascade::new("recorder", vec![TimerSpec::new("sec", 3, record)]).unwrap();
        let mut r = Recorder::default();
        let ctx = ctx();

        for count in 1..=6 {
            cascade
                .fire(&mut r, &ctx, &Tick::boundary(Granularity::Second, count))
                .unwrap();
        }
        assert_eq!(r.fired, vec![(Granularity::Second, 3), (Granularity::Second, 6)]);
    }

    #[test]
    fn granularities_fire_only_on_their_own_flag() {
        let cascade = TimerCascade::new(
            "recorder",
            vec![
                TimerSpec::every(Granularity::Second, 1, record),
                TimerSpec::every(Granularity::Minute, 1, record),
            ],
        )
        .unwrap();
        let mut r = Recorder::default();
        let ctx = ctx();

        let mut tick = Tick::boundary(Granularity::Minute, 4);
        tick.counts[Granularity::Second.index()] = 240;
        let (fired, flow) = cascade.fire(&mut r, &ctx, &tick).unwrap();

        assert_eq!(fired, 1);
        assert_eq!(flow, Flow::Continue);
        assert_eq!(r.fired, vec![(Granularity::Minute, 4)]);
    }

    #[test]
    fn callback_error_propagates() {
        let cascade = TimerCascade::new("recorder", vec![TimerSpec::new("hour", 1, fail)]).unwrap();
        let mut r = Recorder::default();
        let err = cascade
            .fire(&mut r, &ctx(), &Tick::boundary(Granularity::Hour, 1))
            .unwrap_err();
        assert_eq!(err.as_label(), "agent_handler");
    }

    #[test]
    fn invalid_declarations_are_rejected() {
        let unknown = TimerCascade::new("r", vec![TimerSpec::<Recorder>::new("week", 1, record)]);
        assert!(matches!(unknown, Err(ConfigError::UnknownGranularity { .. })));

        let zero = TimerCascade::new("r", vec![TimerSpec::<Recorder>::new("min", 0, record)]);
        assert!(matches!(zero, Err(ConfigError::ZeroInterval { .. })));

        let empty = TimerCascade::<Recorder>::new("r", Vec::new()).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);
    }
}
