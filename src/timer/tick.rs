//! Heartbeat payload: boundary flags and counters per granularity.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Time granularities of the cron-like timers, finest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Second,
    Minute,
    Hour,
    Day,
}

impl Granularity {
    /// All granularities, finest first.
    pub const ALL: [Granularity; 4] = [
        Granularity::Second,
        Granularity::Minute,
        Granularity::Hour,
        Granularity::Day,
    ];

    /// Short name used in timer declarations.
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Second => "sec",
            Granularity::Minute => "min",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
        }
    }

    /// Position in [`Granularity::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Next coarser granularity (`None` for days).
    pub fn coarser(self) -> Option<Granularity> {
        Granularity::ALL.get(self.index() + 1).copied()
    }
}

impl FromStr for Granularity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sec" => Ok(Granularity::Second),
            "min" => Ok(Granularity::Minute),
            "hour" => Ok(Granularity::Hour),
            "day" => Ok(Granularity::Day),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One heartbeat.
///
/// Each boundary flag says whether this tick crossed a boundary of that granularity; the
/// counters are the number of boundaries crossed so far (monotonic).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Tick {
    /// Heartbeats per second of the emitting clock.
    pub ticks_per_second: u32,
    /// Boundary flags, indexed by [`Granularity::index`].
    pub boundaries: [bool; 4],
    /// Boundary counters, indexed by [`Granularity::index`].
    pub counts: [u64; 4],
}

impl Tick {
    /// True if this tick crossed a boundary of `g`.
    pub fn is_boundary(&self, g: Granularity) -> bool {
        self.boundaries[g.index()]
    }

    /// Boundaries of `g` crossed so far.
    pub fn count(&self, g: Granularity) -> u64 {
        self.counts[g.index()]
    }

    /// A tick crossing only a boundary of `g`, with that granularity's counter at `count`.
    ///
    /// Handy for driving timers by hand.
    pub fn boundary(g: Granularity, count: u64) -> Self {
        let mut tick = Tick::default();
        tick.boundaries[g.index()] = true;
        tick.counts[g.index()] = count;
        tick
    }
}
