//! The source tree a driver hands to the application.

use crate::error::{RecycleError, Result};
use crate::stream::Stream;
use crate::types::Event;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::kind::{Classifier, Handlers, SourceKind};

type SourceFnImpl = dyn Fn(&[Event]) -> Result<SourceNode> + Send + Sync;

/// A named, parameterized source producer, e.g. "the stream for key K".
#[derive(Clone)]
pub struct SourceFn {
    name: Arc<str>,
    func: Arc<SourceFnImpl>,
}

impl SourceFn {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Event]) -> Result<SourceNode> + Send + Sync + 'static,
    {
        let name: String = name.into();
        Self {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Event]) -> Result<SourceNode> {
        (self.func)(args)
    }
}

impl fmt::Debug for SourceFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceFn({})", self.name)
    }
}

/// Runtime shape of a driver's output.
#[derive(Clone, Debug)]
pub enum SourceNode {
    /// Keyed grouping of further sources.
    Mapping(BTreeMap<String, SourceNode>),
    /// A live push stream.
    Stream(Stream),
    /// A callable producing another source.
    Function(SourceFn),
    /// Fixed ordered data, passed through untouched.
    Sequence(Vec<Event>),
    /// Explicit "no value".
    Absent,
}

impl SourceNode {
    /// Build a mapping from key/source pairs.
    pub fn mapping<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, SourceNode)>,
        K: Into<String>,
    {
        SourceNode::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a function source.
    pub fn function<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Event]) -> Result<SourceNode> + Send + Sync + 'static,
    {
        SourceNode::Function(SourceFn::new(name, func))
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            SourceNode::Mapping(_) => SourceKind::Mapping,
            SourceNode::Stream(_) => SourceKind::Stream,
            SourceNode::Function(_) => SourceKind::Function,
            SourceNode::Sequence(_) => SourceKind::Sequence,
            SourceNode::Absent => SourceKind::Absent,
        }
    }

    /// Child of a mapping.
    pub fn get(&self, key: &str) -> Option<&SourceNode> {
        match self {
            SourceNode::Mapping(entries) => entries.get(key),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            SourceNode::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&SourceFn> {
        match self {
            SourceNode::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Call a function source.
    pub fn call(&self, args: &[Event]) -> Result<SourceNode> {
        match self {
            SourceNode::Function(func) => func.call(args),
            other => Err(RecycleError::NotCallable(other.kind())),
        }
    }

    /// Build a source tree from an untyped JSON value.
    ///
    /// Objects become mappings, arrays sequences and `null` absent. Anything
    /// else, including a bare scalar inside an object, is unclassifiable.
    pub fn from_json(value: Event) -> Result<Self> {
        let reject = |value: Event| -> Result<SourceNode> {
            Err(RecycleError::UnclassifiableValue(value.to_string()))
        };

        json_classifier().dispatch(
            value,
            Handlers::new()
                .on(SourceKind::Mapping, |value: Event| match value {
                    Event::Object(entries) => entries
                        .into_iter()
                        .map(|(key, child)| Ok((key, SourceNode::from_json(child)?)))
                        .collect::<Result<BTreeMap<_, _>>>()
                        .map(SourceNode::Mapping),
                    other => reject(other),
                })
                .on(SourceKind::Stream, reject)
                .on(SourceKind::Function, reject)
                .on(SourceKind::Sequence, |value: Event| match value {
                    Event::Array(items) => Ok(SourceNode::Sequence(items)),
                    other => reject(other),
                })
                .on(SourceKind::Absent, |_| Ok(SourceNode::Absent)),
        )
    }
}

fn json_classifier() -> Classifier<Event> {
    // JSON never carries live streams or callables.
    Classifier::new()
        .with(SourceKind::Mapping, Event::is_object)
        .with(SourceKind::Stream, |_| false)
        .with(SourceKind::Function, |_| false)
        .with(SourceKind::Sequence, Event::is_array)
        .with(SourceKind::Absent, Event::is_null)
}

impl From<Stream> for SourceNode {
    fn from(stream: Stream) -> Self {
        SourceNode::Stream(stream)
    }
}

impl From<SourceFn> for SourceNode {
    fn from(func: SourceFn) -> Self {
        SourceNode::Function(func)
    }
}
