//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the switchyard runtime.
//!
//! Config is used in two ways:
//! 1. **Runtime creation**: `Runtime::builder(config)`
//! 2. **Agent construction**: `AgentActor::new(agent, &bus, &config)` reads the loop knobs
//!
//! ## Sentinel values
//! - `burst_limit = 0` → clamped to 1 (an agent always makes progress on its low queue)
//! - `high_poll = 0s`  → clamped to 1ms (the idle wait never degenerates into a spin)
//! - `time_base = 0s`  → clamped to 1ms

use std::time::Duration;

/// Global configuration for the runtime and the agent loops it drives.
///
/// ## Field semantics
/// - `burst_limit`: max low-priority messages dispatched per loop cycle
/// - `high_poll`: how long an idle agent waits on its high-priority queue per cycle
/// - `grace`: maximum wait for agents to stop after the quit broadcast
/// - `event_capacity`: lifecycle event ring buffer size (min 1)
/// - `time_base`: heartbeat period
/// - `prune_uninterested`: let the bus skip topics an agent advertised no interest in
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of low-priority messages drained by one agent in a single cycle.
    pub burst_limit: usize,

    /// Bounded wait on the high-priority queue when an agent has nothing to do.
    ///
    /// Keeps the loop responsive to shutdown and to its low-priority queue.
    pub high_poll: Duration,

    /// Maximum time to wait for agents to stop after the quit message was broadcast.
    ///
    /// If exceeded, the runtime aborts the remaining agents and returns
    /// `RuntimeError::GraceExceeded`.
    pub grace: Duration,

    /// Capacity of the lifecycle event broadcast channel.
    pub event_capacity: usize,

    /// Period of the heartbeat that drives timers.
    ///
    /// Boundary detection assumes the period divides a second (250ms → 4 ticks per second).
    pub time_base: Duration,

    /// When `true`, the bus stops delivering a topic to an agent once that agent reported
    /// having no handler for it.
    ///
    /// Purely an optimization: agents filter such topics themselves either way.
    pub prune_uninterested: bool,
}

impl Config {
    /// Returns the burst limit clamped to a minimum of 1.
    #[inline]
    pub fn burst_limit_clamped(&self) -> usize {
        self.burst_limit.max(1)
    }

    /// Returns the high-priority poll clamped to a minimum of 1ms.
    #[inline]
    pub fn high_poll_clamped(&self) -> Duration {
        self.high_poll.max(Duration::from_millis(1))
    }

    /// Returns the event capacity clamped to a minimum of 1.
    #[inline]
    pub fn event_capacity_clamped(&self) -> usize {
        self.event_capacity.max(1)
    }

    /// Returns the heartbeat period clamped to a minimum of 1ms.
    #[inline]
    pub fn time_base_clamped(&self) -> Duration {
        self.time_base.max(Duration::from_millis(1))
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `burst_limit = 5`
    /// - `high_poll = 100ms`
    /// - `grace = 10s`
    /// - `event_capacity = 1024`
    /// - `time_base = 250ms` (4 ticks per second)
    /// - `prune_uninterested = false`
    fn default() -> Self {
        Self {
            burst_limit: 5,
            high_poll: Duration::from_millis(100),
            grace: Duration::from_secs(10),
            event_capacity: 1024,
            time_base: Duration::from_millis(250),
            prune_uninterested: false,
        }
    }
}
