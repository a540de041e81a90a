//! Source kinds and runtime-checked dispatch over them.
//!
//! Typed [`SourceNode`](super::SourceNode) trees are walked with a plain
//! `match`. The [`Classifier`] exists for values that arrive untyped, where
//! the shape is only knowable at runtime: it tests named predicates in order
//! and hands the value to exactly one handler, after checking that the
//! handler set covers every kind.

use crate::error::{RecycleError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The runtime shape of a source value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Mapping,
    Stream,
    Function,
    Sequence,
    Absent,
}

impl SourceKind {
    /// Every kind, in tag-name order.
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Absent,
        SourceKind::Function,
        SourceKind::Mapping,
        SourceKind::Sequence,
        SourceKind::Stream,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Mapping => "Mapping",
            SourceKind::Stream => "Stream",
            SourceKind::Function => "Function",
            SourceKind::Sequence => "Sequence",
            SourceKind::Absent => "Absent",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Ordered set of named predicates. The first match wins.
pub struct Classifier<T> {
    predicates: Vec<(SourceKind, Predicate<T>)>,
}

impl<T: fmt::Debug> Classifier<T> {
    pub fn new() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }

    /// Add a predicate. Predicates are tested in the order they were added.
    pub fn with<P>(mut self, kind: SourceKind, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.predicates.push((kind, Box::new(predicate)));
        self
    }

    /// Kind of the first predicate matching `value`.
    pub fn classify(&self, value: &T) -> Option<SourceKind> {
        self.predicates
            .iter()
            .find(|(_, predicate)| predicate(value))
            .map(|(kind, _)| *kind)
    }

    /// Classify `value` and run the matching handler.
    ///
    /// Fails with [`RecycleError::MissingHandler`] before classifying if any
    /// kind lacks a handler, and with [`RecycleError::UnclassifiableValue`]
    /// if no predicate matches.
    pub fn dispatch<R>(&self, value: T, mut handlers: Handlers<'_, T, R>) -> Result<R> {
        if let Some(missing) = handlers.first_missing() {
            return Err(RecycleError::MissingHandler(missing));
        }

        let kind = self
            .classify(&value)
            .ok_or_else(|| RecycleError::UnclassifiableValue(format!("{:?}", value)))?;

        match handlers.handlers.remove(&kind) {
            Some(handler) => handler(value),
            None => Err(RecycleError::MissingHandler(kind)),
        }
    }
}

impl<T: fmt::Debug> Default for Classifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

type Handler<'a, T, R> = Box<dyn FnOnce(T) -> Result<R> + 'a>;

/// One handler per [`SourceKind`].
pub struct Handlers<'a, T, R> {
    handlers: BTreeMap<SourceKind, Handler<'a, T, R>>,
}

impl<'a, T, R> Handlers<'a, T, R> {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Register the handler for `kind`, replacing any earlier one.
    pub fn on<F>(mut self, kind: SourceKind, handler: F) -> Self
    where
        F: FnOnce(T) -> Result<R> + 'a,
    {
        self.handlers.insert(kind, Box::new(handler));
        self
    }

    /// First kind, in tag-name order, with no handler.
    pub fn first_missing(&self) -> Option<SourceKind> {
        SourceKind::ALL
            .iter()
            .copied()
            .find(|kind| !self.handlers.contains_key(kind))
    }
}

impl<'a, T, R> Default for Handlers<'a, T, R> {
    fn default() -> Self {
        Self::new()
    }
}
