//! Core types shared by the recorder, the log and the orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A value carried by a stream.
pub type Event = serde_json::Value;

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// One step of an [`Identifier`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Segment {
    /// The driver output itself.
    Root,
    /// A key inside a mapping.
    Key(String),
    /// A call to a source function, with its rendered arguments.
    Call { name: String, args: String },
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Root => write!(f, ":root"),
            Segment::Key(key) => write!(f, "/{}", key),
            Segment::Call { name, args } => write!(f, "/{}({})", name, args),
        }
    }
}

/// Hierarchical path naming a stream endpoint inside a driver's source tree.
///
/// Two independently built trees with the same shape produce the same
/// identifiers, which is what replay matches on. Comparison is by segment,
/// so a key that happens to contain `/` never aliases a deeper path.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identifier(Vec<Segment>);

impl Identifier {
    /// Identifier of a driver's whole output.
    pub fn root() -> Self {
        Identifier(vec![Segment::Root])
    }

    /// Child identifier for a mapping key.
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.child(Segment::Key(key.into()))
    }

    /// Child identifier for a call to the function `name` with `args`.
    pub fn call(&self, name: impl Into<String>, args: &[Event]) -> Self {
        self.child(Segment::Call {
            name: name.into(),
            args: render_args(args),
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Whether `self` lies at or below `other`.
    pub fn starts_with(&self, other: &Identifier) -> bool {
        self.0.starts_with(&other.0)
    }

    fn child(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend_from_slice(&self.0);
        segments.push(segment);
        Identifier(segments)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self)
    }
}

/// Render call arguments as a comma-joined list.
///
/// Strings render without quotes and `null` renders empty, so `"1"` and `1`
/// produce the same text and therefore the same identifier.
pub fn render_args(args: &[Event]) -> String {
    args.iter().map(render_arg).collect::<Vec<_>>().join(",")
}

fn render_arg(arg: &Event) -> String {
    match arg {
        Event::Null => String::new(),
        Event::String(s) => s.clone(),
        Event::Array(items) => render_args(items),
        other => other.to_string(),
    }
}

/// One value observed on the stream found at `identifier`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub identifier: Identifier,
    pub event: Event,
    /// Capture time, informational only. Replay order is log order.
    pub timestamp: Timestamp,
}

impl LogEntry {
    /// Create an entry stamped with the current time.
    pub fn new(identifier: Identifier, event: Event) -> Self {
        Self {
            identifier,
            event,
            timestamp: Timestamp::now(),
        }
    }
}
