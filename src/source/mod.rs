//! Source trees produced by drivers.
//!
//! A driver's output is a [`SourceNode`]: a mapping, a stream, a function
//! producing further sources, a plain sequence, or absent. Typed trees are
//! matched exhaustively; untyped values go through a [`Classifier`].

mod kind;
mod node;

pub use kind::{Classifier, Handlers, SourceKind};
pub use node::{SourceFn, SourceNode};
