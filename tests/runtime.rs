use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use switchyard::{
    Agent, Config, Context, Dispatch, Envelope, Event, EventKind, Flow, Granularity,
    HandlerResult, LogGovernor, LogRecord, MemorySink, Message, Payload, RateLimits, Runtime,
    RuntimeError, Subscribe, TimerSpec, Topic, AgentError, Level,
};

fn cfg() -> Config {
    Config {
        high_poll: Duration::from_millis(5),
        grace: Duration::from_secs(1),
        ..Config::default()
    }
}

#[derive(Clone, Default)]
struct Collector(Arc<Mutex<Vec<Event>>>);

impl Collector {
    fn kinds(&self) -> Vec<EventKind> {
        self.0.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    fn find(&self, kind: EventKind) -> Option<Event> {
        self.0.lock().unwrap().iter().find(|e| e.kind == kind).cloned()
    }
}

#[async_trait]
impl Subscribe for Collector {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().unwrap().push(ev.clone());
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

/// Counts `logged` announcements, like a desktop notifier would.
struct Notifier {
    seen: Arc<AtomicUsize>,
}

fn on_logged(n: &mut Notifier, _: &Context, _: &Message) -> HandlerResult {
    n.seen.fetch_add(1, Ordering::SeqCst);
    Ok(Flow::Continue)
}

impl Agent for Notifier {
    fn name(&self) -> &str {
        "notifier"
    }

    fn handlers(&self) -> Dispatch<Self> {
        Dispatch::new().on(switchyard::topic::LOGGED, on_logged)
    }
}

/// Misbehaving agent: fails, panics, blocks or stops on request.
struct Worker {
    label: &'static str,
}

fn on_boom(_: &mut Worker, _: &Context, _: &Message) -> HandlerResult {
    Err(AgentError::handler("boom", "exploded"))
}

fn on_panic(_: &mut Worker, _: &Context, _: &Message) -> HandlerResult {
    panic!("handler bug");
}

fn on_block(_: &mut Worker, _: &Context, _: &Message) -> HandlerResult {
    std::thread::sleep(Duration::from_millis(300));
    Ok(Flow::Continue)
}

fn on_stop(_: &mut Worker, _: &Context, _: &Message) -> HandlerResult {
    Ok(Flow::Shutdown)
}

impl Agent for Worker {
    fn name(&self) -> &str {
        self.label
    }

    fn handlers(&self) -> Dispatch<Self> {
        Dispatch::new()
            .on("boom", on_boom)
            .on("panic", on_panic)
            .on("block", on_block)
            .on("stop", on_stop)
    }
}

fn send(rt: &Runtime, topic: &str) {
    rt.bus().publish(Envelope::custom(
        rt.id(),
        Topic::parse(topic).unwrap(),
        Payload::new(),
    ));
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn governor_limits_llog_and_announces_accepted_records() {
    let rt = Runtime::builder(cfg()).build();
    let sink = MemorySink::new();
    let limits = RateLimits::new([("error", [2, 5, 5, 5])]).unwrap();
    rt.spawn(LogGovernor::new(limits, sink.clone()).unwrap()).unwrap();
    let seen = Arc::new(AtomicUsize::new(0));
    rt.spawn(Notifier { seen: seen.clone() }).unwrap();

    for i in 0..5 {
        let record = LogRecord::tagged("net/timeout", Level::Error, format!("attempt {i}"));
        rt.bus().publish(Envelope::new(rt.id(), Message::LimitedLog(record)));
    }
    settle().await;

    let lines: Vec<String> = sink.lines().into_iter().map(|(_, text)| text).collect();
    assert_eq!(lines, vec!["attempt 0", "attempt 1"]);
    assert_eq!(seen.load(Ordering::SeqCst), 2);

    rt.shutdown().await.unwrap();
    assert!(sink.is_closed());
}

#[tokio::test]
async fn shutdown_broadcasts_quit_and_reports_lifecycle() {
    let events = Collector::default();
    let rt = Runtime::builder(cfg())
        .with_subscriber(Arc::new(events.clone()))
        .build();
    rt.spawn(Worker { label: "a" }).unwrap();
    rt.spawn(Worker { label: "b" }).unwrap();
    settle().await;

    rt.shutdown().await.unwrap();
    settle().await;

    let kinds = events.kinds();
    assert_eq!(kinds.iter().filter(|k| **k == EventKind::AgentStarted).count(), 2);
    assert_eq!(kinds.iter().filter(|k| **k == EventKind::AgentStopped).count(), 2);
    assert!(kinds.contains(&EventKind::ShutdownRequested));
    assert!(kinds.contains(&EventKind::AllStoppedWithin));

    let stopped = events.find(EventKind::AgentStopped).unwrap();
    assert_eq!(stopped.reason.as_deref(), Some("quit"));
    assert!(rt.alive().snapshot().await.is_empty());
    assert!(rt.bus().is_empty());
}

/// Takes its time with every event.
#[derive(Clone, Default)]
struct Sluggish(Collector);

#[async_trait]
impl Subscribe for Sluggish {
    async fn on_event(&self, ev: &Event) {
        tokio::time::sleep(Duration::from_millis(15)).await;
        self.0.on_event(ev).await;
    }

    fn name(&self) -> &'static str {
        "sluggish"
    }
}

#[tokio::test]
async fn shutdown_waits_for_slow_subscribers() {
    let slow = Sluggish::default();
    let rt = Runtime::builder(cfg())
        .with_subscriber(Arc::new(slow.clone()))
        .build();
    rt.spawn(Worker { label: "a" }).unwrap();
    rt.spawn(Worker { label: "b" }).unwrap();

    rt.shutdown().await.unwrap();

    let kinds = slow.0.kinds();
    assert_eq!(kinds.first(), Some(&EventKind::AgentStarted));
    assert_eq!(kinds.last(), Some(&EventKind::AllStoppedWithin));
    assert_eq!(kinds.len(), 6);
    assert!(rt.shutdown().await.is_ok());
}

#[tokio::test]
async fn failing_agent_is_reported_and_others_keep_running() {
    let events = Collector::default();
    let rt = Runtime::builder(cfg())
        .with_subscriber(Arc::new(events.clone()))
        .build();
    let failing = rt.spawn(Worker { label: "fragile" }).unwrap();
    let seen = Arc::new(AtomicUsize::new(0));
    rt.spawn(Notifier { seen: seen.clone() }).unwrap();

    send(&rt, "boom");
    settle().await;
    rt.bus()
        .publish(Envelope::new(rt.id(), Message::Logged(LogRecord::new(Level::Info, "still here"))));
    settle().await;

    let failed = events.find(EventKind::AgentFailed).expect("failure reported");
    assert_eq!(failed.agent, Some(failing));
    assert_eq!(failed.name.as_deref(), Some("fragile"));
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert!(!rt.alive().is_alive(failing).await);

    rt.shutdown().await.unwrap();
}

#[tokio::test]
async fn panicking_agent_is_contained() {
    let events = Collector::default();
    let rt = Runtime::builder(cfg())
        .with_subscriber(Arc::new(events.clone()))
        .build();
    rt.spawn(Worker { label: "panicky" }).unwrap();

    send(&rt, "panic");
    settle().await;

    let ev = events.find(EventKind::AgentPanicked).expect("panic reported");
    assert_eq!(ev.reason.as_deref(), Some("handler bug"));
    assert!(rt.bus().is_empty());
    rt.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn grace_exceeded_names_stuck_agents() {
    let cfg = Config {
        grace: Duration::from_millis(50),
        ..cfg()
    };
    let rt = Runtime::builder(cfg).build();
    rt.spawn(Worker { label: "blocker" }).unwrap();
    rt.spawn(Worker { label: "idle" }).unwrap();
    settle().await;

    send(&rt, "block");
    tokio::time::sleep(Duration::from_millis(20)).await;

    match rt.shutdown().await {
        Err(RuntimeError::GraceExceeded { stuck, .. }) => assert_eq!(stuck, vec!["blocker"]),
        other => panic!("expected grace exceeded, got {other:?}"),
    }
}

#[tokio::test]
async fn run_returns_when_every_agent_exits() {
    let rt = Runtime::builder(cfg()).build();
    rt.spawn(Worker { label: "one-shot" }).unwrap();
    send(&rt, "stop");

    tokio::time::timeout(Duration::from_secs(2), rt.run())
        .await
        .expect("run finished")
        .unwrap();
}

#[tokio::test]
async fn request_shutdown_stops_run() {
    let rt = Runtime::builder(cfg()).build();
    rt.spawn(Worker { label: "steady" }).unwrap();

    let handle = rt.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.request_shutdown();
    });
    tokio::time::timeout(Duration::from_secs(2), rt.run())
        .await
        .expect("run finished")
        .unwrap();
}

struct Ticker {
    seconds: Arc<AtomicUsize>,
}

fn on_second(t: &mut Ticker, _: &Context, _: Granularity, _: u64) -> HandlerResult {
    t.seconds.fetch_add(1, Ordering::SeqCst);
    Ok(Flow::Continue)
}

impl Agent for Ticker {
    fn handlers(&self) -> Dispatch<Self> {
        Dispatch::new()
    }

    fn timers(&self) -> Vec<TimerSpec<Self>> {
        vec![TimerSpec::new("sec", 1, on_second)]
    }
}

#[tokio::test(start_paused = true)]
async fn heartbeat_drives_agent_timers() {
    let cfg = Config {
        time_base: Duration::from_millis(100),
        ..cfg()
    };
    let rt = Runtime::builder(cfg).build();
    let seconds = Arc::new(AtomicUsize::new(0));
    rt.spawn(Ticker { seconds: seconds.clone() }).unwrap();
    rt.start_heartbeat();

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert!(seconds.load(Ordering::SeqCst) >= 2);
    rt.shutdown().await.unwrap();
}

#[tokio::test]
async fn invalid_timer_declaration_is_a_config_error() {
    struct Broken;

    fn noop(_: &mut Broken, _: &Context, _: Granularity, _: u64) -> HandlerResult {
        Ok(Flow::Continue)
    }

    impl Agent for Broken {
        fn handlers(&self) -> Dispatch<Self> {
            Dispatch::new()
        }

        fn timers(&self) -> Vec<TimerSpec<Self>> {
            vec![TimerSpec::new("min", 0, noop)]
        }
    }

    let rt = Runtime::builder(cfg()).build();
    let err = rt.spawn(Broken).unwrap_err();
    assert_eq!(err.as_label(), "config_zero_interval");
    assert!(rt.bus().is_empty());
}
