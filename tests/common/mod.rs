//! Shared fixtures: a minimal closure-based application runtime and drivers.

#![allow(dead_code)]

use parking_lot::Mutex;
use recycle::{
    Application, Dispose, Driver, Drivers, Event, Result, SourceNode, Sources, Sinks, Stream,
    Subscription,
};
use std::collections::HashMap;
use std::sync::Arc;

/// An application description: wires observers onto sources when run.
pub type TestApp = Arc<dyn Fn(&Sources) -> Result<Vec<Subscription>> + Send + Sync>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn app<F>(wire: F) -> TestApp
where
    F: Fn(&Sources) -> Result<Vec<Subscription>> + Send + Sync + 'static,
{
    Arc::new(wire)
}

/// Calls every driver with a fresh sink, then wires the application on run.
pub fn runtime(app: &TestApp, drivers: &Drivers) -> Result<Application> {
    let mut sources = Sources::new();
    let mut sinks = Sinks::new();
    for (name, driver) in drivers {
        let sink = Stream::new();
        sources.insert(name.clone(), driver.call(sink.clone())?);
        sinks.insert(name.clone(), sink);
    }

    let wire = Arc::clone(app);
    let wired = sources.clone();
    Ok(Application::new(sources, sinks, move || {
        let subscriptions = wire(&wired)?;
        Ok(Box::new(move || {
            for subscription in &subscriptions {
                subscription.unsubscribe();
            }
            Ok(())
        }) as Dispose)
    }))
}

/// Values observed by an application subscriber.
#[derive(Clone, Default)]
pub struct Seen(Arc<Mutex<Vec<Event>>>);

impl Seen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, stream: &Stream) -> Subscription {
        let seen = Arc::clone(&self.0);
        stream.subscribe(move |event| seen.lock().push(event.clone()))
    }

    pub fn values(&self) -> Vec<Event> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Stream at `sources[driver][key]`.
pub fn stream_at(sources: &Sources, driver: &str, key: &str) -> Stream {
    sources
        .get(driver)
        .and_then(|node| node.get(key))
        .and_then(SourceNode::as_stream)
        .cloned()
        .unwrap_or_else(|| panic!("no stream at {}/{}", driver, key))
}

/// A driver exposing `{clicks: Stream}`; the latest clicks stream is
/// published to `current` so tests can emit on it.
pub fn clicks_driver(current: Arc<Mutex<Stream>>) -> impl Driver {
    move |_sink: Stream| {
        let clicks = Stream::new();
        *current.lock() = clicks.clone();
        Ok(SourceNode::mapping([("clicks", SourceNode::Stream(clicks))]))
    }
}

/// Per-key streams behind a `{channel: Function}` driver.
#[derive(Clone, Default)]
pub struct Channels(Arc<Mutex<HashMap<String, Stream>>>);

impl Channels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Stream {
        self.0.lock().entry(key.to_string()).or_default().clone()
    }

    pub fn emit(&self, key: &str, event: impl Into<Event>) {
        self.get(key).emit(event);
    }
}

/// A driver exposing `{channel: Function}` where `channel(k)` is a stream.
pub fn channel_driver(channels: Channels) -> impl Driver {
    move |_sink: Stream| {
        let channels = channels.clone();
        Ok(SourceNode::mapping([(
            "channel",
            SourceNode::function("channel", move |args| {
                let key = args.first().and_then(Event::as_str).unwrap_or_default();
                Ok(SourceNode::Stream(channels.get(key)))
            }),
        )]))
    }
}
