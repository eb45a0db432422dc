//! # Heartbeat source.
//!
//! [`Clock`] turns a fixed-period heartbeat into second/minute/hour/day boundaries;
//! [`Heartbeat`] drives a clock from a Tokio interval and publishes every [`Tick`] on the
//! high-priority path of the [`MessageBus`].
//!
//! ## Boundary rules
//! ```text
//! second: tick_count % ticks_per_second == 0   (checked before incrementing tick_count)
//! minute: on a second boundary, when sec_count % 60 == 0
//! hour:   on a minute boundary, when min_count % 60 == 0
//! day:    on an hour boundary,  when hour_count % 24 == 0
//! ```
//! The very first tick is therefore a second boundary with `sec_count = 1`.

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::tick::{Granularity, Tick};
use crate::switch::{AgentId, Envelope, Message, MessageBus};

/// Boundary detector for a fixed time base.
#[derive(Clone, Debug)]
pub struct Clock {
    ticks_per_second: u32,
    tick_count: u64,
    counts: [u64; 4],
}

impl Clock {
    /// Creates a clock for a heartbeat period of `time_base` (at least one tick per second).
    pub fn new(time_base: Duration) -> Self {
        let ms = time_base.as_millis().max(1);
        let ticks_per_second = (1000 / ms).clamp(1, u128::from(u32::MAX)) as u32;
        Self {
            ticks_per_second,
            tick_count: 0,
            counts: [0; 4],
        }
    }

    /// Heartbeats per second.
    pub fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }

    /// Registers one heartbeat and returns the resulting tick.
    pub fn advance(&mut self) -> Tick {
        let mut boundaries = [false; 4];
        boundaries[0] = self.tick_count % u64::from(self.ticks_per_second) == 0;
        self.tick_count += 1;

        if boundaries[0] {
            self.counts[0] += 1;
            let wraps = [60, 60, 24];
            for (g, wrap) in Granularity::ALL[1..].iter().zip(wraps) {
                let finer = g.index() - 1;
                if self.counts[finer] % wrap != 0 {
                    break;
                }
                boundaries[g.index()] = true;
                self.counts[g.index()] += 1;
            }
        }

        Tick {
            ticks_per_second: self.ticks_per_second,
            boundaries,
            counts: self.counts,
        }
    }
}

/// Publishes a [`Tick`] on the bus every time base.
pub struct Heartbeat {
    id: AgentId,
    clock: Clock,
    period: Duration,
    bus: MessageBus,
}

impl Heartbeat {
    /// Creates a heartbeat publishing on `bus` every `period`.
    pub fn new(bus: MessageBus, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self {
            id: AgentId::next(),
            clock: Clock::new(period),
            period,
            bus,
        }
    }

    /// Origin id stamped on every published tick.
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Publishes ticks until `token` is cancelled.
    pub async fn run(mut self, token: CancellationToken) {
        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::debug!(origin = %self.id, period = ?self.period, "heartbeat started");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    let tick = self.clock.advance();
                    self.bus.publish(Envelope::new(self.id, Message::Tick(tick)));
                }
            }
        }
        tracing::debug!(origin = %self.id, "heartbeat stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_is_a_second_boundary() {
        let mut clock = Clock::new(Duration::from_millis(250));
        assert_eq!(clock.ticks_per_second(), 4);

        let first = clock.advance();
        assert!(first.is_boundary(Granularity::Second));
        assert_eq!(first.count(Granularity::Second), 1);

        for _ in 0..3 {
            assert!(!clock.advance().is_boundary(Granularity::Second));
        }
        let fifth = clock.advance();
        assert!(fifth.is_boundary(Granularity::Second));
        assert_eq!(fifth.count(Granularity::Second), 2);
    }

    #[test]
    fn minute_boundary_after_sixty_seconds() {
        let mut clock = Clock::new(Duration::from_secs(1));
        let ticks: Vec<Tick> = (0..120).map(|_| clock.advance()).collect();

        let minutes: Vec<u64> = ticks
            .iter()
            .filter(|t| t.is_boundary(Granularity::Minute))
            .map(|t| t.count(Granularity::Second))
            .collect();
        assert_eq!(minutes, vec![60, 120]);
        assert_eq!(ticks[119].count(Granularity::Minute), 2);
        assert!(ticks.iter().all(|t| !t.is_boundary(Granularity::Hour)));
    }

    #[test]
    fn hour_and_day_boundaries_cascade() {
        let mut clock = Clock::new(Duration::from_secs(1));
        let mut hours = 0;
        let mut days = 0;
        for _ in 0..(24 * 3600) {
            let t = clock.advance();
            if t.is_boundary(Granularity::Hour) {
                hours += 1;
            }
            if t.is_boundary(Granularity::Day) {
                days += 1;
                assert!(t.is_boundary(Granularity::Hour));
                assert!(t.is_boundary(Granularity::Minute));
            }
        }
        assert_eq!(hours, 24);
        assert_eq!(days, 1);
    }

    #[test]
    fn slow_time_base_still_ticks_every_second() {
        let clock = Clock::new(Duration::from_secs(5));
        assert_eq!(clock.ticks_per_second(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_publishes_high_priority_ticks() {
        let bus = MessageBus::new();
        let mut mb = bus.mailbox(AgentId::next(), "listener");
        let token = CancellationToken::new();
        let hb = Heartbeat::new(bus.clone(), Duration::from_millis(250));
        let origin = hb.id();
        let handle = tokio::spawn(hb.run(token.clone()));

        time::sleep(Duration::from_millis(600)).await;
        token.cancel();
        handle.await.unwrap();

        let first = mb.high.try_recv().expect("tick published");
        assert_eq!(first.origin(), origin);
        assert!(matches!(first.message(), Message::Tick(t) if t.is_boundary(Granularity::Second)));
        assert!(mb.high.depth() >= 1);
        assert!(mb.low.is_empty());
    }
}
