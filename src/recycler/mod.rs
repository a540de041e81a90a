//! Rebuilding a running application without losing its driver history.
//!
//! The orchestrator disposes the current instance, builds a fresh driver set,
//! runs the (possibly changed) application on it, then replays each old
//! driver's log into the same-named new driver.
//!
//! # Example
//!
//! ```ignore
//! let mut reload = recycler(runtime, &app, || {
//!     let mut drivers = Drivers::new();
//!     drivers.insert("dom".into(), recyclable(make_dom_driver()));
//!     drivers
//! })?;
//!
//! // ... later, after the application code changed:
//! reload(&new_app)?;
//! ```

mod orchestrator;
mod runtime;

pub use orchestrator::{
    checkpoint_path, rebuild, recycle, recycler, transfer_logs, DriverFactory, Recycler,
    RecyclerConfig,
};
pub use runtime::{Application, Dispose, Instance, Runtime, Sinks, Sources};
