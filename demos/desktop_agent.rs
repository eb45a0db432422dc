//! # Demo: desktop_agent
//!
//! A miniature desktop sync client built on switchyard.
//!
//! Shows how to:
//! - Declare handlers and timers on an [`Agent`].
//! - Route noisy warnings through the [`LogGovernor`] with `llog`.
//! - React to accepted records (`logged`) like a notification area would.
//! - Query the governor's credits with `credits?`.
//! - Attach the built-in [`LogWriter`] to see lifecycle events.
//!
//! ## Flow
//! ```text
//! Heartbeat ── tick ──► Syncer (every sec: scan, every 3 sec: credits?)
//!                         └─► llog("npath/scan", warning, ...) ──► LogGovernor
//!                                                                  ├─► sink (tracing)
//!                                                                  └─► logged ──► Tray
//! LogGovernor ── credits ──► Syncer (prints the ledger)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example desktop_agent --features logging
//! ```

use std::{sync::Arc, time::Duration};

use switchyard::{
    Agent, CREDITS, Config, Context, Dispatch, Flow, Granularity, HandlerResult, Level,
    LogGovernor, LogWriter, Message, Payload, RateLimits, Runtime, TimerSpec, TracingSink,
    topic,
};
use tracing_subscriber::EnvFilter;

/// Scans a watched folder and complains about it. A lot.
#[derive(Default)]
struct Syncer {
    scans: u64,
}

fn scan(s: &mut Syncer, ctx: &Context, _: Granularity, _: u64) -> HandlerResult {
    s.scans += 1;
    for file in ["a.flac", "b.flac", "c.flac"] {
        ctx.log_limited(
            "npath/scan",
            Level::Warning,
            format!("scan {}: {file} is locked", s.scans),
        );
    }
    Ok(Flow::Continue)
}

fn ask_credits(_: &mut Syncer, ctx: &Context, _: Granularity, _: u64) -> HandlerResult {
    ctx.send("credits?", Payload::new())
        .map_err(|e| switchyard::AgentError::handler("credits?", e))?;
    Ok(Flow::Continue)
}

fn on_credits(_: &mut Syncer, _: &Context, msg: &Message) -> HandlerResult {
    if let Some(ledger) = msg.payload().and_then(|p| p.get(0)) {
        println!("[syncer] credits: {ledger}");
    }
    Ok(Flow::Continue)
}

impl Agent for Syncer {
    fn name(&self) -> &str {
        "syncer"
    }

    fn handlers(&self) -> Dispatch<Self> {
        Dispatch::new().on(CREDITS, on_credits)
    }

    fn timers(&self) -> Vec<TimerSpec<Self>> {
        vec![
            TimerSpec::every(Granularity::Second, 1, scan),
            TimerSpec::new("sec", 3, ask_credits),
        ]
    }
}

/// Shows accepted records, the way a system tray would.
struct Tray;

fn on_logged(_: &mut Tray, _: &Context, msg: &Message) -> HandlerResult {
    if let Some(record) = msg.log_record() {
        println!("[tray] {}: {}", record.level.as_str(), record.text);
    }
    Ok(Flow::Continue)
}

impl Agent for Tray {
    fn name(&self) -> &str {
        "tray"
    }

    fn handlers(&self) -> Dispatch<Self> {
        Dispatch::new().on(topic::LOGGED, on_logged)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = Config {
        grace: Duration::from_secs(2),
        ..Config::default()
    };
    let rt = Runtime::builder(cfg)
        .with_subscriber(Arc::new(LogWriter::new()))
        .build();

    let limits = RateLimits::from_toml_str(
        r#"
        [categories]
        npath = [2, 4, 100, 1000]
        error = [5, 20, 100, 1000]
        "#,
    )?;
    rt.spawn(LogGovernor::new(limits, TracingSink::new())?)?;
    rt.spawn(Syncer::default())?;
    rt.spawn(Tray)?;
    rt.start_heartbeat();

    let stopper = rt.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(7)).await;
        stopper.request_shutdown();
    });

    rt.run().await?;
    Ok(())
}
