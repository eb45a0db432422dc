//! # Hierarchical rate-limited logging.
//!
//! [`LogGovernor`] is an ordinary agent: it receives `llog` messages, asks the
//! [`CreditLedger`] whether the record's category still has credit in all four windows, and
//! forwards admitted records to a [`LogSink`].
//!
//! - [`RateLimits`]: per-category `[sec, min, hour, day]` ceilings (TOML).
//! - [`CreditBucket`] / [`CreditLedger`]: the credit cascade.
//! - [`LogSink`]: [`TracingSink`], [`FileSink`], [`MemorySink`].

mod agent;
mod bucket;
mod limits;
mod sink;

pub use agent::{CREDITS, GovernorStats, LogGovernor};
pub use bucket::{Admission, CreditBucket, CreditLedger};
pub use limits::{DEFAULT_FALLBACK, RateLimits};
pub use sink::{FileSink, LogSink, MemorySink, TracingSink};
