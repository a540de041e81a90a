//! Multi-subscriber push stream.

use crate::types::Event;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::listener::Listener;

type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

struct Inner {
    /// Registered callbacks in subscription order.
    callbacks: Mutex<Vec<(u64, Callback)>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

/// A push-based, multi-subscriber, unbounded sequence of values.
///
/// Cloning yields another handle to the same stream. Values are delivered
/// synchronously on the emitting thread, in subscription order. A new
/// subscriber only sees values emitted after it subscribed.
#[derive(Clone)]
pub struct Stream {
    inner: Arc<Inner>,
}

impl Stream {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                callbacks: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a callback for every future value.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.callbacks.lock().push((id, Arc::new(callback)));

        Subscription {
            id,
            stream: Arc::downgrade(&self.inner),
        }
    }

    /// Subscribe through a channel instead of a callback.
    pub fn listen(&self) -> Listener {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let subscription = self.subscribe(move |event| {
            if sender.send(event.clone()).is_err() {
                tracing::trace!("listener receiver gone, dropping event");
            }
        });
        Listener::new(subscription, receiver)
    }

    /// Emit a value produced by the stream's owner.
    pub fn emit(&self, event: impl Into<Event>) {
        self.deliver(&event.into());
    }

    /// Push a value from outside the stream's owner.
    ///
    /// Reserved for replay: it reaches exactly the same subscribers as
    /// [`Stream::emit`], but marks the call site as injected data.
    pub fn inject(&self, event: &Event) {
        self.deliver(event);
    }

    /// Derive a stream that runs `inspect` on every value before passing it on.
    ///
    /// The derived stream stays attached until the returned subscription is
    /// released.
    pub fn tap<F>(&self, inspect: F) -> (Stream, Subscription)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let tapped = Stream::new();
        let downstream = tapped.clone();
        let subscription = self.subscribe(move |event| {
            inspect(event);
            downstream.deliver(event);
        });
        (tapped, subscription)
    }

    /// Number of active subscriptions.
    pub fn listener_count(&self) -> usize {
        self.inner.callbacks.lock().len()
    }

    /// Whether two handles refer to the same stream.
    pub fn ptr_eq(&self, other: &Stream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn deliver(&self, event: &Event) {
        // Snapshot so callbacks may subscribe, unsubscribe or emit re-entrantly.
        let callbacks: Vec<Callback> = self
            .inner
            .callbacks
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            callback(event);
        }
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle to one registered callback.
///
/// Dropping the handle keeps the callback registered; call
/// [`Subscription::unsubscribe`] to release it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    stream: Weak<Inner>,
}

impl Subscription {
    /// Remove the callback. Returns false if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        let Some(inner) = self.stream.upgrade() else {
            return false;
        };
        let mut callbacks = inner.callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|(id, _)| *id != self.id);
        callbacks.len() != before
    }

    pub fn is_active(&self) -> bool {
        self.stream
            .upgrade()
            .map(|inner| inner.callbacks.lock().iter().any(|(id, _)| *id == self.id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collect(stream: &Stream) -> (Subscription, Arc<Mutex<Vec<Event>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = stream.subscribe(move |event| sink.lock().push(event.clone()));
        (subscription, seen)
    }

    #[test]
    fn test_emit_reaches_all_subscribers_in_order() {
        let stream = Stream::new();
        let (_a, first) = collect(&stream);
        let (_b, second) = collect(&stream);

        stream.emit(1);
        stream.emit("two");

        assert_eq!(*first.lock(), vec![json!(1), json!("two")]);
        assert_eq!(*second.lock(), vec![json!(1), json!("two")]);
    }

    #[test]
    fn test_late_subscriber_misses_past_values() {
        let stream = Stream::new();
        stream.emit(1);
        let (_sub, seen) = collect(&stream);
        stream.emit(2);
        assert_eq!(*seen.lock(), vec![json!(2)]);
    }

    #[test]
    fn test_unsubscribe() {
        let stream = Stream::new();
        let (sub, seen) = collect(&stream);
        assert_eq!(stream.listener_count(), 1);

        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        assert!(!sub.is_active());

        stream.emit(1);
        assert!(seen.lock().is_empty());
        assert_eq!(stream.listener_count(), 0);
    }

    #[test]
    fn test_dropping_subscription_keeps_callback() {
        let stream = Stream::new();
        let (sub, seen) = collect(&stream);
        drop(sub);
        stream.emit(1);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_tap_is_transparent() {
        let stream = Stream::new();
        let inspected = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&inspected);
        let (tapped, tap) = stream.tap(move |event| record.lock().push(event.clone()));
        let (_sub, seen) = collect(&tapped);

        stream.emit(1);
        stream.inject(&json!(2));

        assert_eq!(*inspected.lock(), vec![json!(1), json!(2)]);
        assert_eq!(*seen.lock(), vec![json!(1), json!(2)]);

        assert!(tap.unsubscribe());
        stream.emit(3);
        assert_eq!(seen.lock().len(), 2);
        assert_eq!(stream.listener_count(), 0);
    }

    #[test]
    fn test_reentrant_emit() {
        let source = Stream::new();
        let echo = Stream::new();
        let forward = echo.clone();
        source.subscribe(move |event| forward.emit(event.clone()));
        let (_sub, seen) = collect(&echo);

        source.emit("ping");
        assert_eq!(*seen.lock(), vec![json!("ping")]);
    }

    #[test]
    fn test_ptr_eq() {
        let stream = Stream::new();
        assert!(stream.ptr_eq(&stream.clone()));
        assert!(!stream.ptr_eq(&Stream::new()));
    }
}
