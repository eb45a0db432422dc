//! Runtime core: orchestration and lifecycle.
//!
//! The public API from this module is [`Runtime`] (plus its [`RuntimeBuilder`]), which spawns
//! agent loops, drives the heartbeat, and performs graceful shutdown.
//!
//! Internal modules:
//! - [`runtime`]: agent tasks, lifecycle event fan-out, quit broadcast with grace;
//! - [`builder`]: wires the buses, subscribers and alive tracker;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod runtime;
mod shutdown;

pub use builder::RuntimeBuilder;
pub use runtime::Runtime;
pub use shutdown::wait_for_shutdown_signal;
