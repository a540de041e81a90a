//! # Recycle
//!
//! Record and replay for the effect boundaries of a push-based reactive
//! application, so the application can be torn down and rebuilt (for
//! example after a code change) while its subscribers see continuity.
//!
//! ## Core Concepts
//!
//! - **Sources**: Trees of mappings, streams, source functions, sequences
//!   and absent values produced by drivers
//! - **Recorder**: Walks a source tree and taps every stream it can reach
//! - **Recyclable drivers**: Own the capture log and replay it on demand
//! - **Recycler**: Disposes the old instance, builds a new one and replays
//!   each driver's log into it
//!
//! ## Example
//!
//! ```ignore
//! use recycle::{recyclable, Drivers, Recycler, SourceNode, Stream};
//!
//! let mut recycler = Recycler::bootstrap(runtime, &app, || {
//!     let clicks = Stream::new();
//!     let mut drivers = Drivers::new();
//!     drivers.insert("dom".into(), recyclable(move |_sink: Stream| {
//!         Ok(SourceNode::mapping([("clicks", SourceNode::Stream(clicks.clone()))]))
//!     }));
//!     drivers
//! })?;
//!
//! // The application changed: rebuild it and replay what the drivers saw.
//! recycler.reload(&new_app)?;
//! ```

pub mod driver;
pub mod error;
pub mod log;
pub mod recycler;
pub mod source;
pub mod stream;
pub mod types;

// Re-exports
pub use driver::{
    recyclable, Driver, Drivers, MissingTargetPolicy, Recyclable, RecyclableConfig, ReplayReport,
    DEFAULT_NAMESPACE_KEY,
};
pub use error::{RecycleError, Result};
pub use log::{Log, LogFile};
pub use recycler::{
    checkpoint_path, rebuild, recycle, recycler, transfer_logs, Application, Dispose,
    DriverFactory, Instance, Recycler, RecyclerConfig, Runtime, Sinks, Sources,
};
pub use source::{Classifier, Handlers, SourceFn, SourceKind, SourceNode};
pub use stream::{Listener, Stream, Subscription};
pub use types::*;
