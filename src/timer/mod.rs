//! # Heartbeat and timers.
//!
//! - [`Clock`] / [`Heartbeat`]: fixed-period ticks with second/minute/hour/day boundaries.
//! - [`TimerCascade`]: per-agent timers fired from those boundaries.

mod cascade;
mod clock;
mod tick;

pub use cascade::{TimerCascade, TimerFn, TimerSpec};
pub use clock::{Clock, Heartbeat};
pub use tick::{Granularity, Tick};
