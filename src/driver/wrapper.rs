//! Wrapping a driver with capture and replay.

use crate::error::{RecycleError, Result};
use crate::log::{Log, LogFile};
use crate::source::SourceNode;
use crate::stream::{Stream, Subscription};
use crate::types::{Event, Identifier, LogEntry};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::recorder::record;
use super::Driver;

/// Default mapping key carrying namespace metadata, never proxied or logged.
pub const DEFAULT_NAMESPACE_KEY: &str = "_namespace";

/// What to do when a replay target no longer exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingTargetPolicy {
    /// Drop the entries silently.
    Ignore,
    /// Drop the entries and emit a warning.
    #[default]
    Warn,
    /// Fail before injecting anything.
    Fail,
}

/// Configuration for a wrapped driver.
#[derive(Clone, Debug)]
pub struct RecyclableConfig {
    /// Handling of log entries with no live stream in the new tree.
    pub missing_target: MissingTargetPolicy,

    /// Mapping key passed through unwrapped.
    /// Default: "_namespace"
    pub namespace_key: String,
}

impl Default for RecyclableConfig {
    fn default() -> Self {
        Self {
            missing_target: MissingTargetPolicy::default(),
            namespace_key: DEFAULT_NAMESPACE_KEY.to_string(),
        }
    }
}

/// Outcome of a replay.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Entries injected into a live stream.
    pub replayed: usize,
    /// Entries with no live target.
    pub dropped_entries: usize,
    /// Identifiers with no live target.
    pub dropped: BTreeSet<Identifier>,
}

/// State shared between a wrapped driver and the taps it installed.
pub(crate) struct DriverState {
    pub(crate) config: RecyclableConfig,
    pub(crate) log: Mutex<Log>,
    /// Live streams of the current source tree, by identifier.
    pub(crate) proxies: Mutex<HashMap<Identifier, Stream>>,
    /// Recording taps on the current tree's streams.
    taps: Mutex<Vec<Subscription>>,
    replaying: AtomicBool,
}

impl DriverState {
    pub(crate) fn new(config: RecyclableConfig) -> Self {
        Self {
            config,
            log: Mutex::new(Log::new()),
            proxies: Mutex::new(HashMap::new()),
            taps: Mutex::new(Vec::new()),
            replaying: AtomicBool::new(false),
        }
    }

    pub(crate) fn register(&self, identifier: Identifier, stream: Stream) {
        tracing::debug!(identifier = %identifier, "registered stream proxy");
        self.proxies.lock().insert(identifier, stream);
    }

    pub(crate) fn hold(&self, tap: Subscription) {
        self.taps.lock().push(tap);
    }

    /// Detach every tap and forget the current tree.
    pub(crate) fn release(&self) {
        let taps = std::mem::take(&mut *self.taps.lock());
        for tap in &taps {
            tap.unsubscribe();
        }
        self.proxies.lock().clear();
        if !taps.is_empty() {
            tracing::debug!(taps = taps.len(), "released recording taps");
        }
    }

    /// Append an observed value unless a replay is in progress.
    pub(crate) fn capture(&self, identifier: &Identifier, event: &Event) {
        if self.replaying.load(Ordering::SeqCst) {
            return;
        }
        tracing::trace!(identifier = %identifier, "captured event");
        self.log
            .lock()
            .push(LogEntry::new(identifier.clone(), event.clone()));
    }
}

impl Drop for DriverState {
    fn drop(&mut self) {
        for tap in self.taps.get_mut().iter() {
            tap.unsubscribe();
        }
    }
}

/// Holds the replaying flag up for its lifetime, restoring the prior value.
pub(crate) struct ReplayGuard<'a> {
    flag: &'a AtomicBool,
    previous: bool,
}

impl<'a> ReplayGuard<'a> {
    fn engage(flag: &'a AtomicBool) -> Self {
        let previous = flag.swap(true, Ordering::SeqCst);
        Self { flag, previous }
    }
}

impl Drop for ReplayGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(self.previous, Ordering::SeqCst);
    }
}

/// A driver augmented with a capture log and replay.
///
/// Calling it runs the inner driver and proxies the output rooted at
/// `:root`. Every value subsequently emitted by a discovered stream is
/// appended to the log, except while a replay is running.
#[derive(Clone)]
pub struct Recyclable {
    driver: Arc<dyn Driver>,
    state: Arc<DriverState>,
}

impl Recyclable {
    pub fn new(driver: impl Driver + 'static) -> Self {
        Self::with_config(driver, RecyclableConfig::default())
    }

    pub fn with_config(driver: impl Driver + 'static, config: RecyclableConfig) -> Self {
        Self {
            driver: Arc::new(driver),
            state: Arc::new(DriverState::new(config)),
        }
    }

    pub fn config(&self) -> &RecyclableConfig {
        &self.state.config
    }

    /// Snapshot of the capture log.
    pub fn log(&self) -> Log {
        self.state.log.lock().clone()
    }

    /// Move the capture log out, leaving this driver with an empty one.
    pub fn take_log(&self) -> Log {
        std::mem::take(&mut *self.state.log.lock())
    }

    pub fn is_replaying(&self) -> bool {
        self.state.replaying.load(Ordering::SeqCst)
    }

    /// Identifiers of every stream discovered so far, sorted.
    pub fn identifiers(&self) -> Vec<Identifier> {
        let mut ids: Vec<_> = self.state.proxies.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The original stream registered at `identifier`.
    pub fn proxy(&self, identifier: &Identifier) -> Option<Stream> {
        self.state.proxies.lock().get(identifier).cloned()
    }

    /// Adopt `log` and push its values into the matching live streams.
    ///
    /// Values are injected synchronously in log order and are not captured
    /// again. Each entry's stream is looked up just before it is pushed, so
    /// streams created by subscribers reacting to earlier entries are
    /// reached too. Entries whose identifier has no live stream are handled
    /// per [`RecyclableConfig::missing_target`]; under `Fail` every target
    /// must exist up front, and on failure the log is still adopted but
    /// nothing is injected.
    pub fn replay(&self, log: Log) -> Result<ReplayReport> {
        if self.state.config.missing_target == MissingTargetPolicy::Fail {
            let missing = {
                let proxies = self.state.proxies.lock();
                log.iter()
                    .map(|entry| &entry.identifier)
                    .filter(|identifier| !proxies.contains_key(*identifier))
                    .min()
                    .cloned()
            };
            if let Some(identifier) = missing {
                *self.state.log.lock() = log;
                return Err(RecycleError::ReplayTargetMissing(identifier));
            }
        }

        let _guard = ReplayGuard::engage(&self.state.replaying);
        let mut report = ReplayReport::default();

        for entry in &log {
            let target = self.state.proxies.lock().get(&entry.identifier).cloned();
            match target {
                Some(stream) => {
                    stream.inject(&entry.event);
                    report.replayed += 1;
                }
                None => {
                    report.dropped_entries += 1;
                    report.dropped.insert(entry.identifier.clone());
                }
            }
        }

        *self.state.log.lock() = log;

        if !report.dropped.is_empty()
            && self.state.config.missing_target == MissingTargetPolicy::Warn
        {
            tracing::warn!(
                dropped_entries = report.dropped_entries,
                identifiers = ?report.dropped,
                "replay targets missing from the new source tree"
            );
        }

        tracing::debug!(
            replayed = report.replayed,
            dropped = report.dropped_entries,
            "replay finished"
        );
        Ok(report)
    }

    /// Detach every recording tap and clear the proxy table.
    ///
    /// The log is kept. Values emitted afterwards are no longer captured.
    pub fn release(&self) {
        self.state.release();
    }

    /// Suspend capture until the guard is dropped.
    pub(crate) fn pause_capture(&self) -> ReplayGuard<'_> {
        ReplayGuard::engage(&self.state.replaying)
    }

    /// Write the capture log to `path`.
    pub fn save_log(&self, path: impl AsRef<Path>) -> Result<()> {
        LogFile::new(path).write(&self.log())
    }

    /// Replay a log previously written with [`Recyclable::save_log`].
    pub fn restore_log(&self, path: impl AsRef<Path>) -> Result<ReplayReport> {
        let log = LogFile::new(path).read()?;
        self.replay(log)
    }
}

impl Driver for Recyclable {
    fn call(&self, sink: Stream) -> Result<SourceNode> {
        self.state.release();
        let sources = self.driver.call(sink)?;
        Ok(record(&self.state, sources, Identifier::root()))
    }
}

impl fmt::Debug for Recyclable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recyclable")
            .field("entries", &self.state.log.lock().len())
            .field("proxies", &self.state.proxies.lock().len())
            .field("replaying", &self.is_replaying())
            .finish()
    }
}

/// Wrap `driver` so its sources are captured and can be replayed.
pub fn recyclable(driver: impl Driver + 'static) -> Recyclable {
    Recyclable::new(driver)
}
