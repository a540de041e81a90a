//! Push streams carried by driver sources.
//!
//! Only the observable contract matters here:
//! - `subscribe` registers a callback for future values
//! - `emit` pushes a value synchronously to every subscriber
//! - `inject` pushes a value from outside (used by replay)
//! - `tap` derives a transparent stream that inspects every value
//!
//! # Example
//!
//! ```ignore
//! let clicks = Stream::new();
//! let listener = clicks.listen();
//!
//! clicks.emit(1);
//! assert_eq!(listener.recv()?, json!(1));
//! ```

mod listener;
mod push;

pub use listener::Listener;
pub use push::{Stream, Subscription};
