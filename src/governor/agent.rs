//! # Rate-limited log governor agent.
//!
//! ```text
//!  llog(tag, level, text) ──► CreditLedger::admit ──┬─ Accepted ──► sink.write + publish `logged`
//!                                                   ├─ Throttled ─► drop (trace)
//!                                                   └─ QuotaReached► drop (trace)
//!  log(level, text)       ──────────────────────────────────────► sink.write
//!  credits?               ──► publish `credits` { buckets snapshot }
//!  tick (sec/min/hour/day)──► CreditLedger::on_boundary
//! ```
//!
//! `llog` and `log` accept both the typed messages ([`Message::LimitedLog`],
//! [`Message::Log`]) and custom messages with positional args `[tag, level, text]` and
//! `[level, text]`. A lone `[text]` for `log` is written at `info`. Unknown level strings map
//! to `info`.

use serde::Serialize;

use super::bucket::{Admission, CreditLedger};
use super::limits::RateLimits;
use super::sink::{LogSink, TracingSink};
use crate::agent::{Agent, Context, Dispatch, Flow, HandlerResult};
use crate::error::{AgentError, ConfigError};
use crate::switch::{topic, Level, LogRecord, Message, Payload, Topic};
use crate::timer::{Granularity, TimerSpec};

/// Topic of the reply to a `credits?` query.
pub const CREDITS: &str = "credits";

/// Admission counters since start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GovernorStats {
    pub accepted: u64,
    pub throttled: u64,
    pub quota_reached: u64,
}

/// Agent gating `llog` messages through per-category credit buckets.
pub struct LogGovernor {
    ledger: CreditLedger,
    sink: Box<dyn LogSink>,
    stats: GovernorStats,
}

impl LogGovernor {
    /// Governor writing to `sink` under `limits`.
    pub fn new(limits: RateLimits, sink: impl LogSink) -> Result<Self, ConfigError> {
        limits.validate()?;
        Ok(Self {
            ledger: CreditLedger::new(&limits),
            sink: Box::new(sink),
            stats: GovernorStats::default(),
        })
    }

    /// Default limits, writing through `tracing`.
    pub fn with_defaults() -> Self {
        Self {
            ledger: CreditLedger::new(&RateLimits::default()),
            sink: Box::new(TracingSink::new()),
            stats: GovernorStats::default(),
        }
    }

    /// Current credit state.
    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    /// Admission counters.
    pub fn stats(&self) -> GovernorStats {
        self.stats
    }

    /// Offers one record; returns the governing category and the decision.
    pub fn admit(&mut self, ctx: &Context, record: LogRecord) -> (String, Admission) {
        let (category, admission) = self.ledger.admit(&record);
        match admission {
            Admission::Accepted => {
                self.stats.accepted += 1;
                self.write(record.level, &record.text);
                ctx.publish(Message::Logged(record));
            }
            Admission::Throttled => {
                self.stats.throttled += 1;
                tracing::trace!(%category, tag = %record.tag, "llog throttled");
            }
            Admission::QuotaReached => {
                self.stats.quota_reached += 1;
                tracing::trace!(%category, tag = %record.tag, "llog dropped: daily quota reached");
            }
        }
        (category, admission)
    }

    fn write(&mut self, level: Level, text: &str) {
        if let Err(err) = self.sink.write(level, text) {
            tracing::warn!(error = %err, "log sink write failed");
        }
    }
}

fn text_arg(payload: &Payload, i: usize) -> String {
    match payload.get(i) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn limited_record(msg: &Message) -> Result<LogRecord, AgentError> {
    if let Some(record) = msg.log_record() {
        return Ok(record.clone());
    }
    let payload = msg
        .payload()
        .ok_or_else(|| AgentError::payload(topic::LIMITED_LOG, "expected a log record"))?;
    let tag = payload
        .str_arg(0)
        .ok_or_else(|| AgentError::payload(topic::LIMITED_LOG, "missing tag"))?;
    let level = Level::parse_lenient(payload.str_arg(1).unwrap_or_default());
    Ok(LogRecord::tagged(tag, level, text_arg(payload, 2)))
}

fn plain_record(msg: &Message) -> Result<LogRecord, AgentError> {
    if let Some(record) = msg.log_record() {
        return Ok(record.clone());
    }
    let payload = msg
        .payload()
        .ok_or_else(|| AgentError::payload(topic::LOG, "expected a log record"))?;
    if payload.args().len() == 1 {
        return Ok(LogRecord::new(Level::Info, text_arg(payload, 0)));
    }
    let level = Level::parse_lenient(payload.str_arg(0).unwrap_or_default());
    Ok(LogRecord::new(level, text_arg(payload, 1)))
}

fn on_llog(g: &mut LogGovernor, ctx: &Context, msg: &Message) -> HandlerResult {
    let record = limited_record(msg)?;
    g.admit(ctx, record);
    Ok(Flow::Continue)
}

fn on_log(g: &mut LogGovernor, _ctx: &Context, msg: &Message) -> HandlerResult {
    let record = plain_record(msg)?;
    g.write(record.level, &record.text);
    Ok(Flow::Continue)
}

fn on_credits(g: &mut LogGovernor, ctx: &Context, _msg: &Message) -> HandlerResult {
    let payload = Payload::new()
        .arg(g.ledger.snapshot())
        .with("stats", serde_json::to_value(g.stats).unwrap_or_default());
    ctx.publish(Message::Custom {
        topic: Topic::from_static(CREDITS),
        payload,
    });
    Ok(Flow::Continue)
}

fn on_boundary(g: &mut LogGovernor, _ctx: &Context, gran: Granularity, _count: u64) -> HandlerResult {
    g.ledger.on_boundary(gran);
    Ok(Flow::Continue)
}

impl Agent for LogGovernor {
    fn name(&self) -> &str {
        "log-governor"
    }

    fn handlers(&self) -> Dispatch<Self> {
        Dispatch::new()
            .on(topic::LIMITED_LOG, on_llog)
            .on(topic::LOG, on_log)
            .on_query(CREDITS, on_credits)
    }

    fn timers(&self) -> Vec<TimerSpec<Self>> {
        Granularity::ALL
            .into_iter()
            .map(|g| TimerSpec::every(g, 1, on_boundary))
            .collect()
    }

    fn on_shutdown(&mut self, _ctx: &Context) {
        if let Err(err) = self.sink.close() {
            tracing::warn!(error = %err, "log sink close failed");
        }
    }
}
