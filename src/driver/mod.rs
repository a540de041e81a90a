//! Drivers and their recording wrapper.
//!
//! A driver turns the application's outgoing effects (its sink stream) into
//! a [`SourceNode`] tree. [`recyclable`] lifts a driver into a
//! [`Recyclable`] that:
//! - taps every stream in the tree and logs each emitted value
//! - wraps every function so the sources it returns are tapped too
//! - replays a log from a previous driver into its own live streams
//!
//! # Example
//!
//! ```ignore
//! let driver = recyclable(|_sink: Stream| {
//!     Ok(SourceNode::mapping([("clicks", SourceNode::Stream(clicks.clone()))]))
//! });
//!
//! let sources = driver.call(sink)?;
//! clicks.emit(1);
//! assert_eq!(driver.log().len(), 1);
//! ```

mod recorder;
mod wrapper;

use crate::error::Result;
use crate::source::SourceNode;
use crate::stream::Stream;
use std::collections::BTreeMap;

pub use wrapper::{
    recyclable, MissingTargetPolicy, Recyclable, RecyclableConfig, ReplayReport,
    DEFAULT_NAMESPACE_KEY,
};

/// A boundary module translating sinks into sources.
pub trait Driver: Send + Sync {
    fn call(&self, sink: Stream) -> Result<SourceNode>;
}

impl<F> Driver for F
where
    F: Fn(Stream) -> Result<SourceNode> + Send + Sync,
{
    fn call(&self, sink: Stream) -> Result<SourceNode> {
        self(sink)
    }
}

/// A driver set, by driver name.
pub type Drivers = BTreeMap<String, Recyclable>;
